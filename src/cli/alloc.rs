//! Allocation command: how the portfolio splits across currencies and
//! sectors, in the reporting currency.

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::currency::{Currency, CurrencyRateProvider};
use crate::core::enrich::EnrichmentService;
use crate::core::price::QuoteProvider;
use crate::core::valuation::{
    apply_asset_info, compute_metrics, GroupMetrics, PortfolioMetrics, Valuer,
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

    println!("{}", render(&metrics, config.currency));

    for warning in &portfolio.warnings {
        println!(
            "{}",
            ui::style_text(&format!("Warning: {warning}"), ui::StyleType::Warning)
        );
    }
    Ok(())
}

fn group_table<'g>(
    title: &str,
    reporting: Currency,
    groups: impl Iterator<Item = (String, &'g GroupMetrics)>,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(title),
        ui::header_cell(&format!("Invested ({reporting})")),
        ui::header_cell(&format!("Value ({reporting})")),
        ui::header_cell("Return"),
        ui::header_cell("Share"),
    ]);

    let mut rows: Vec<(String, &GroupMetrics)> = groups.collect();
    // Largest allocation first.
    rows.sort_by(|a, b| b.1.current.total_cmp(&a.1.current));

    for (name, group) in rows {
        table.add_row(vec![
            Cell::new(name),
            ui::money_cell(group.invested),
            ui::money_cell(group.current),
            ui::change_cell(group.return_percent),
            Cell::new(format!("{:.2}%", group.share_percent)),
        ]);
    }
    table.to_string()
}

pub fn render(metrics: &PortfolioMetrics, reporting: Currency) -> String {
    let mut output = format!(
        "Allocation: {}\n\n",
        ui::style_text("By currency", ui::StyleType::Title)
    );
    output.push_str(&group_table(
        "Currency",
        reporting,
        metrics
            .currency_metrics
            .iter()
            .map(|(c, g)| (c.to_string(), g)),
    ));

    if metrics.sector_metrics.is_empty() {
        output.push_str("\n\nNo sector data available.");
    } else {
        output.push_str(&format!(
            "\n\nAllocation: {}\n\n",
            ui::style_text("By sector", ui::StyleType::Title)
        ));
        output.push_str(&group_table(
            "Sector",
            reporting,
            metrics
                .sector_metrics
                .iter()
                .map(|(s, g)| (s.clone(), g)),
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::core::valuation::Performer;

    fn group(invested: f64, current: f64, share: f64) -> GroupMetrics {
        GroupMetrics {
            invested,
            current,
            return_value: current - invested,
            return_percent: if invested > 0.0 {
                (current - invested) / invested * 100.0
            } else {
                0.0
            },
            share_percent: share,
        }
    }

    fn metrics_fixture() -> PortfolioMetrics {
        let mut currency_metrics = HashMap::new();
        currency_metrics.insert(Currency::Brl, group(1000.0, 1200.0, 68.57));
        currency_metrics.insert(Currency::Usd, group(500.0, 550.0, 31.43));

        let mut sector_metrics = HashMap::new();
        sector_metrics.insert("Energy".to_string(), group(800.0, 900.0, 51.43));

        PortfolioMetrics {
            total_investment: 1500.0,
            current_value: 1750.0,
            total_return: 250.0,
            percent_return: 16.67,
            best_performer: Performer {
                ticker: "PETR4".to_string(),
                return_percent: 25.0,
            },
            worst_performer: Performer {
                ticker: "SPY".to_string(),
                return_percent: 10.0,
            },
            currency_metrics,
            sector_metrics,
            exchange_rate: 5.0,
        }
    }

    #[test]
    fn test_render_currency_and_sector_tables() {
        let rendered = render(&metrics_fixture(), Currency::Brl);
        assert!(rendered.contains("By currency"));
        assert!(rendered.contains("BRL"));
        assert!(rendered.contains("USD"));
        assert!(rendered.contains("By sector"));
        assert!(rendered.contains("Energy"));
    }

    #[test]
    fn test_render_without_sector_data() {
        let mut metrics = metrics_fixture();
        metrics.sector_metrics.clear();
        let rendered = render(&metrics, Currency::Brl);
        assert!(rendered.contains("No sector data available."));
    }
}
