use async_trait::async_trait;
use aws_sdk_costexplorer::Client as CeClient;
use common::{CostDataSet, PeriodKey, RawCostRecord};

#[async_trait]
pub trait CostQuery: Send + Sync {
    async fn fetch(&self, periods: &[PeriodKey]) -> anyhow::Result<CostDataSet>;
}

pub struct CeCostQuery {
    pub client: CeClient,
}

#[async_trait]
impl CostQuery for CeCostQuery {
    async fn fetch(&self, periods: &[PeriodKey]) -> anyhow::Result<CostDataSet> {
        ce::get_cost_data(&self.client, periods).await
    }
}

/// Synthetic data source for running the server without AWS credentials.
pub struct DemoCostQuery;

fn demo_record(key: &str, usage_type: Option<&str>, period: PeriodKey, amount: f64) -> RawCostRecord {
    RawCostRecord {
        key: key.to_string(),
        usage_type: usage_type.map(|u| u.to_string()),
        period,
        amount,
        usage: Some(730.0),
    }
}

#[async_trait]
impl CostQuery for DemoCostQuery {
    async fn fetch(&self, periods: &[PeriodKey]) -> anyhow::Result<CostDataSet> {
        let mut data = CostDataSet::default();
        for (index, period) in periods.iter().copied().enumerate() {
            let growth = 1.0 + index as f64 * 0.25;
            data.records.push(demo_record(
                "Amazon Elastic Compute Cloud - Compute",
                Some("BoxUsage:t3.large"),
                period,
                120.0 * growth,
            ));
            data.records.push(demo_record(
                "Amazon Simple Storage Service",
                Some("TimedStorage-ByteHrs"),
                period,
                45.0,
            ));
            data.records.push(demo_record(
                "Amazon Relational Database Service",
                Some("InstanceUsage:db.t3.medium"),
                period,
                80.0 * growth,
            ));
            data.regional
                .push(demo_record("us-east-1", None, period, 180.0 * growth));
            data.regional
                .push(demo_record("eu-west-1", None, period, 65.0));
        }
        Ok(data)
    }
}
