use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use stepwright_timing_store::{JsonFileTimingStore, TimingKey, TimingRecord, TimingStore};

use super::context::CliContext;
use super::output::render_structured;

#[derive(Args, Clone, Debug)]
pub struct TimingsArgs {
    /// Only show estimates recorded for this plan id
    #[arg(long)]
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimingRow {
    pub plan_id: Option<String>,
    pub plan_label: Option<String>,
    pub step_id: String,
    pub action_kind: String,
    pub estimate_secs: f64,
    pub sample_count: u64,
}

pub fn timing_rows(
    store: &JsonFileTimingStore,
    entries: Vec<(TimingKey, TimingRecord)>,
    plan: Option<&str>,
) -> Vec<TimingRow> {
    let mut rows: Vec<TimingRow> = entries
        .into_iter()
        .filter(|(key, _)| plan.map_or(true, |plan| key.plan_id.as_deref() == Some(plan)))
        .map(|(key, record)| TimingRow {
            plan_label: key.plan_id.as_deref().and_then(|id| store.label(id)),
            plan_id: key.plan_id,
            step_id: key.step_id,
            action_kind: key.action_kind,
            estimate_secs: record.estimate,
            sample_count: record.sample_count,
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.plan_id, &a.step_id, &a.action_kind).cmp(&(&b.plan_id, &b.step_id, &b.action_kind))
    });
    rows
}

pub async fn cmd_timings(args: TimingsArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx
        .config()
        .timing
        .store_path
        .as_ref()
        .context("timing.store_path is not configured; timings are only kept in memory")?;
    let store = JsonFileTimingStore::open(path)
        .with_context(|| format!("Failed to open timing store {}", path.display()))?;

    let rows = timing_rows(&store, store.snapshot(), args.plan.as_deref());
    match render_structured(ctx.output(), &rows)? {
        Some(text) => println!("{}", text),
        None if rows.is_empty() => println!("No learned timings in {}", path.display()),
        None => {
            for row in &rows {
                println!(
                    "{:<24} {:<38} {:<32} {:>7.2}s  n={}",
                    row.plan_label
                        .as_deref()
                        .or(row.plan_id.as_deref())
                        .unwrap_or("-"),
                    row.step_id,
                    row.action_kind,
                    row.estimate_secs,
                    row.sample_count
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_timing_store::TimingSample;

    #[test]
    fn rows_filter_by_plan_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileTimingStore::open(dir.path().join("timings.json")).unwrap();
        for (plan, step) in [("p2", "s1"), ("p1", "s2"), ("p1", "s1")] {
            store
                .update(
                    &TimingSample::new(TimingKey::new(Some(plan), step, "click"), 1.5)
                        .with_label(Some(format!("Form {}", plan))),
                )
                .unwrap();
        }

        let rows = timing_rows(&store, store.snapshot(), Some("p1"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].step_id, "s1");
        assert_eq!(rows[1].step_id, "s2");
        assert_eq!(rows[0].plan_label.as_deref(), Some("Form p1"));
        assert_eq!(rows[0].sample_count, 1);

        assert_eq!(timing_rows(&store, store.snapshot(), None).len(), 3);
    }
}
