use std::fs;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_chart(server: &MockServer, symbol: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_quote_summary(server: &MockServer, symbol: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v10/finance/quoteSummary/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub fn chart_body(price: f64, currency: &str) -> String {
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "{currency}", "regularMarketPrice": {price} }},
                        "indicators": {{ "quote": [{{ "close": [{price}] }}] }}
                    }}]
                }}
            }}"#
        )
    }

    pub fn info_body(sector: &str, name: &str) -> String {
        format!(
            r#"{{
                "quoteSummary": {{
                    "result": [{{
                        "assetProfile": {{ "sector": "{sector}" }},
                        "quoteType": {{ "shortName": "{name}" }}
                    }}]
                }}
            }}"#
        )
    }
}

fn write_config(server_uri: &str, holdings_yaml: &str) -> tempfile::NamedTempFile {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
holdings:
{holdings_yaml}
providers:
  yahoo:
    base_url: {server_uri}
currency: "BRL"
"#
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");
    config_file
}

#[test_log::test(tokio::test)]
async fn test_summary_flow_with_mixed_currencies() {
    let server = wiremock::MockServer::start().await;

    test_utils::mount_chart(&server, "PETR4.SA", &test_utils::chart_body(25.0, "BRL")).await;
    test_utils::mount_chart(&server, "SPY", &test_utils::chart_body(440.0, "USD")).await;
    test_utils::mount_chart(
        &server,
        "USDBRL=X",
        r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 5.0}}]}}"#,
    )
    .await;
    test_utils::mount_quote_summary(
        &server,
        "PETR4.SA",
        &test_utils::info_body("Energy", "Petrobras PN"),
    )
    .await;
    test_utils::mount_quote_summary(
        &server,
        "SPY",
        &test_utils::info_body("Financial Services", "SPDR S&P 500"),
    )
    .await;

    let config_file = write_config(
        &server.uri(),
        r#"  - ticker: "PETR4"
    average_cost: 20.0
    quantity: 100
  - ticker: "SPY"
    average_cost: 400.0
    quantity: 2
    currency: "USD"
"#,
    );

    let result = carteira::run_command(
        carteira::AppCommand::Summary,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Summary command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_summary_flow_survives_unreachable_provider() {
    // Nothing mounted: every quote, rate and info request fails. The run
    // still completes with estimated prices and the fallback rate.
    let server = wiremock::MockServer::start().await;

    let config_file = write_config(
        &server.uri(),
        r#"  - ticker: "PETR4"
    average_cost: 20.0
    quantity: 100
"#,
    );

    let result = carteira::run_command(
        carteira::AppCommand::Summary,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Summary command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_alloc_flow_with_sector_data() {
    let server = wiremock::MockServer::start().await;

    test_utils::mount_chart(&server, "PETR4.SA", &test_utils::chart_body(25.0, "BRL")).await;
    test_utils::mount_chart(&server, "VALE3.SA", &test_utils::chart_body(62.0, "BRL")).await;
    test_utils::mount_chart(
        &server,
        "USDBRL=X",
        r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 5.0}}]}}"#,
    )
    .await;
    test_utils::mount_quote_summary(
        &server,
        "PETR4.SA",
        &test_utils::info_body("Energy", "Petrobras PN"),
    )
    .await;
    test_utils::mount_quote_summary(
        &server,
        "VALE3.SA",
        &test_utils::info_body("Basic Materials", "Vale ON"),
    )
    .await;

    let config_file = write_config(
        &server.uri(),
        r#"  - ticker: "PETR4"
    average_cost: 20.0
    quantity: 100
  - ticker: "VALE3"
    average_cost: 60.0
    quantity: 50
"#,
    );

    let result = carteira::run_command(
        carteira::AppCommand::Alloc,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Alloc command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_bdr_holding_priced_via_underlying() {
    let server = wiremock::MockServer::start().await;

    // AAPL34 is quoted through the underlying AAPL in USD.
    test_utils::mount_chart(&server, "AAPL", &test_utils::chart_body(200.0, "USD")).await;
    test_utils::mount_chart(
        &server,
        "USDBRL=X",
        r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 5.0}}]}}"#,
    )
    .await;
    test_utils::mount_quote_summary(
        &server,
        "AAPL",
        &test_utils::info_body("Technology", "Apple Inc."),
    )
    .await;

    let config_file = write_config(
        &server.uri(),
        r#"  - ticker: "AAPL34"
    average_cost: 50.0
    quantity: 10
"#,
    );

    let result = carteira::run_command(
        carteira::AppCommand::Summary,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Summary command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_invalid_holdings_fail_loudly() {
    let server = wiremock::MockServer::start().await;

    let config_file = write_config(
        &server.uri(),
        r#"  - ticker: "PETR4"
    average_cost: 20.0
    quantity: 0
"#,
    );

    let result = carteira::run_command(
        carteira::AppCommand::Summary,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
    let message = format!("{:?}", result.unwrap_err());
    assert!(message.contains("Failed to parse config file"), "{message}");
}
