//! Print one sample.

use corpusedit_common::config::AppConfig;
use corpusedit_corpus_model::SampleView;

pub fn run(config: &AppConfig, number: usize, files: &[String], json: bool) -> anyhow::Result<()> {
    let dataset = super::load(config, files)?;
    let index = number
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("Sample numbers start at 1"))?;
    let view = dataset.sample_view(index)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render(&view));
    }
    Ok(())
}

/// Operator-facing rendering of a sample.
pub fn render(view: &SampleView) -> String {
    let marker = if view.modified { "  [modified]" } else { "" };
    let gender = view.gender.map_or("", |g| g.label());
    [
        format!("Sample {}/{}{marker}", view.index + 1, view.total),
        format!("  Region:    {}", view.region),
        format!("  Province:  {} ({})", view.province_name, view.province_code),
        format!("  Speaker:   {}", view.speaker_id),
        format!("  Gender:    {gender}"),
        format!("  Filename:  {}", view.filename),
        format!("  Duration:  {:.2}s", view.duration_secs),
        format!("  Source:    {}", view.source),
        format!("  Text:      {}", view.text),
    ]
    .join("\n")
}
