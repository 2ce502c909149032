//! `optiroute probe` command implementation

use super::catalog::status_label;
use crate::output::{self, OutputFormat};
use optiroute_foundation::SolverRouter;
use std::collections::BTreeMap;

pub async fn run(router: &SolverRouter, format: OutputFormat) -> anyhow::Result<()> {
    let availability: BTreeMap<String, bool> =
        router.refresh_availability().await.into_iter().collect();

    if format == OutputFormat::Json {
        println!("{}", output::to_json(&availability)?);
        return Ok(());
    }

    let rows = router
        .registry()
        .list_all()
        .into_iter()
        .map(|cap| {
            let checked = cap
                .last_checked
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            vec![
                cap.name,
                status_label(cap.status).to_string(),
                cap.version_info.unwrap_or_else(|| "-".to_string()),
                checked,
            ]
        })
        .collect();
    println!("{}", output::table(&["solver", "status", "version", "checked"], rows));

    let available = availability.values().filter(|a| **a).count();
    println!("{available}/{} backends available", availability.len());
    Ok(())
}
