//! Cost Explorer adapter. Fetches net cost and usage observations for a set
//! of months and hands them to the report pipeline as plain records. All
//! network I/O lives here; the pipeline itself never blocks.

use anyhow::Result;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity, GroupDefinition,
    GroupDefinitionType, MetricValue,
};
use aws_sdk_costexplorer::Client;
use common::{CostDataSet, PeriodKey, RawCostRecord};
use std::collections::HashMap;

pub async fn new_client() -> Client {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    Client::new(&config)
}

/// Tax is excluded at the source; the normalizer filters again in case a tax
/// row leaks through anyway.
fn exclude_tax_filter() -> Expression {
    Expression::builder()
        .not(
            Expression::builder()
                .dimensions(
                    DimensionValues::builder()
                        .key(Dimension::RecordType)
                        .values("Tax")
                        .build(),
                )
                .build(),
        )
        .build()
}

fn dimension_group(key: &str) -> GroupDefinition {
    GroupDefinition::builder()
        .r#type(GroupDefinitionType::Dimension)
        .key(key)
        .build()
}

fn month_interval(period: &PeriodKey) -> Result<DateInterval> {
    Ok(DateInterval::builder()
        .start(period.start_date().format("%Y-%m-%d").to_string())
        .end(period.end_date_exclusive().format("%Y-%m-%d").to_string())
        .build()?)
}

fn metric_amount(metrics: Option<&HashMap<String, MetricValue>>, name: &str) -> f64 {
    metrics
        .and_then(|m| m.get(name))
        .and_then(|mv| mv.amount())
        .and_then(|a| a.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// One service/usage-type query and one regional query per requested month,
/// both on NetUnblendedCost with tax filtered out.
pub async fn get_cost_data(client: &Client, periods: &[PeriodKey]) -> Result<CostDataSet> {
    let mut records = Vec::new();
    let mut regional = Vec::new();

    for period in periods {
        let resp = client
            .get_cost_and_usage()
            .time_period(month_interval(period)?)
            .granularity(Granularity::Monthly)
            .metrics("NetUnblendedCost")
            .metrics("UsageQuantity")
            .group_by(dimension_group("SERVICE"))
            .group_by(dimension_group("USAGE_TYPE"))
            .filter(exclude_tax_filter())
            .send()
            .await?;

        for result_by_time in resp.results_by_time() {
            for group in result_by_time.groups() {
                let service = group.keys().first().cloned().unwrap_or_default();
                if service.is_empty() {
                    continue;
                }
                let usage_type = group.keys().get(1).cloned();
                let cost = metric_amount(group.metrics(), "NetUnblendedCost");
                if cost == 0.0 {
                    continue;
                }
                let usage = metric_amount(group.metrics(), "UsageQuantity");
                records.push(RawCostRecord {
                    key: service,
                    usage_type,
                    period: *period,
                    amount: cost,
                    usage: Some(usage),
                });
            }
        }

        let regional_resp = client
            .get_cost_and_usage()
            .time_period(month_interval(period)?)
            .granularity(Granularity::Monthly)
            .metrics("NetUnblendedCost")
            .group_by(dimension_group("REGION"))
            .filter(exclude_tax_filter())
            .send()
            .await?;

        for result_by_time in regional_resp.results_by_time() {
            for group in result_by_time.groups() {
                let region = group.keys().first().cloned().unwrap_or_default();
                if region.is_empty() {
                    continue;
                }
                let cost = metric_amount(group.metrics(), "NetUnblendedCost");
                if cost == 0.0 {
                    continue;
                }
                regional.push(RawCostRecord {
                    key: region,
                    usage_type: None,
                    period: *period,
                    amount: cost,
                    usage: None,
                });
            }
        }
    }

    Ok(CostDataSet { records, regional })
}
