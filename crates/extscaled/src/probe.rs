//! Probe mode — one fetch, printed the way the scaler would report it.
//!
//! The failure policy is not applied here: a failed fetch is reported
//! as an error so the operator sees why the source is unhealthy.

use anyhow::Context;

use extscale_core::{to_metric, Reading, ScalerConfig};

pub async fn run_probe(config: ScalerConfig, json: bool) -> anyhow::Result<()> {
    let source = extscale_source::from_config(&config.source);
    let reading = source
        .fetch()
        .await
        .with_context(|| format!("probe of {} failed", source.describe()))?;

    println!("{}", render(&config, &source.describe(), &reading, json));
    Ok(())
}

fn render(config: &ScalerConfig, source: &str, reading: &Reading, json: bool) -> String {
    let active = config.activity.is_active(reading);
    let metric_value = to_metric(reading);

    if json {
        serde_json::json!({
            "source": source,
            "value": reading.value.as_f64(),
            "timestamp": reading.timestamp,
            "active": active,
            "metric_name": config.metric.name,
            "metric_value": metric_value,
        })
        .to_string()
    } else {
        format!(
            "source:  {source}\nvalue:   {value}{ts}\nactive:  {active} ({value} {op} {threshold})\nmetric:  {name} = {metric_value}",
            value = reading.value,
            ts = reading
                .timestamp
                .as_deref()
                .map(|t| format!(" @ {t}"))
                .unwrap_or_default(),
            op = config.activity.comparison.symbol(),
            threshold = config.activity.threshold,
            name = config.metric.name,
        )
    }
}
