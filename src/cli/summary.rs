//! Portfolio summary command: per-holding valuation table, reporting
//! currency totals and best/worst performers.

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::currency::{Currency, CurrencyRateProvider};
use crate::core::enrich::EnrichmentService;
use crate::core::price::QuoteProvider;
use crate::core::valuation::{
    apply_asset_info, compute_metrics, PortfolioMetrics, PricedPortfolio, Valuer,
};
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(
    config: &AppConfig,
    quotes: &(dyn QuoteProvider),
    rates: &(dyn CurrencyRateProvider),
    enrichment: &EnrichmentService,
) -> Result<()> {
    let valuer = Valuer::new(quotes, rates, config.currency);
    let pb = ui::new_progress_bar(config.holdings.len() as u64, true);
    pb.set_message("Fetching prices...");

    let tickers: Vec<String> = config.holdings.iter().map(|h| h.ticker.clone()).collect();
    let (mut portfolio, info) = tokio::join!(
        valuer.price_holdings(&config.holdings, &pb),
        enrichment.enrich(&tickers)
    );
    pb.finish_and_clear();

    apply_asset_info(&mut portfolio.holdings, &info);
    let metrics = compute_metrics(&portfolio);

    println!("{}", render(&portfolio, &metrics, config.currency));
    Ok(())
}

pub fn render(
    portfolio: &PricedPortfolio,
    metrics: &PortfolioMetrics,
    reporting: Currency,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Name"),
        ui::header_cell("Market"),
        ui::header_cell("Qty"),
        ui::header_cell("Avg Cost"),
        ui::header_cell("Price"),
        ui::header_cell(&format!("Invested ({reporting})")),
        ui::header_cell(&format!("Value ({reporting})")),
        ui::header_cell("Return"),
    ]);

    for h in &portfolio.holdings {
        let currency = h.holding.currency;
        let price = if h.estimated {
            // An estimate, not a quote.
            format!("~{:.2} {currency}", h.current_price)
        } else {
            format!("{:.2} {currency}", h.current_price)
        };

        table.add_row(vec![
            Cell::new(&h.holding.ticker),
            Cell::new(h.display_name.as_deref().unwrap_or("-")),
            Cell::new(h.market.to_string()),
            Cell::new(h.holding.quantity.to_string()),
            Cell::new(format!("{:.2} {currency}", h.holding.average_cost)),
            Cell::new(price),
            ui::money_cell(h.invested_value_reporting),
            ui::money_cell(h.current_value_reporting),
            ui::change_cell(h.return_percent),
        ]);
    }

    let mut output = format!(
        "Portfolio: {}\n\n",
        ui::style_text("Holdings", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());

    output.push_str(&format!(
        "\n\nInvested ({reporting}): {}",
        ui::style_text(
            &format!("{:.2}", metrics.total_investment),
            ui::StyleType::TotalLabel
        )
    ));
    output.push_str(&format!(
        "\nCurrent Value ({reporting}): {}",
        ui::style_text(
            &format!("{:.2}", metrics.current_value),
            ui::StyleType::TotalValue
        )
    ));
    let return_style = if metrics.total_return >= 0.0 {
        ui::StyleType::Gain
    } else {
        ui::StyleType::Loss
    };
    output.push_str(&format!(
        "\nTotal Return ({reporting}): {} ({:.2}%)",
        ui::style_text(&format!("{:.2}", metrics.total_return), return_style),
        metrics.percent_return,
    ));

    output.push_str(&format!(
        "\n\nBest performer:  {} ({})",
        metrics.best_performer.ticker,
        ui::style_text(
            &format!("{:+.2}%", metrics.best_performer.return_percent),
            ui::StyleType::Gain
        )
    ));
    output.push_str(&format!(
        "\nWorst performer: {} ({})",
        metrics.worst_performer.ticker,
        ui::style_text(
            &format!("{:+.2}%", metrics.worst_performer.return_percent),
            ui::StyleType::Loss
        )
    ));

    if (metrics.exchange_rate - 1.0).abs() > f64::EPSILON {
        output.push_str(&format!(
            "\nExchange rate used: {:.4}",
            metrics.exchange_rate
        ));
    }

    for warning in &portfolio.warnings {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(&format!("Warning: {warning}"), ui::StyleType::Warning)
        ));
    }

    output
}
