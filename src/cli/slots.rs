use anyhow::{Result, bail};

use crate::ai::tools::availability::{find_free_slots, format_slot};
use crate::calendar::parse_timestamp;
use crate::cli::calendar_from_config;
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, start: &str, end: &str) -> Result<()> {
    let (calendar, zone) = calendar_from_config(config)?;
    let start = parse_timestamp(start, &zone)?;
    let end = parse_timestamp(end, &zone)?;
    if end <= start {
        bail!("--end must be after --start");
    }

    let slots = find_free_slots(calendar.as_ref(), start, end).await?;
    if slots.is_empty() {
        println!("No 1-hour slots are available between {} and {}.", start, end);
    }
    for slot in slots {
        println!("{}", format_slot(&slot, &zone));
    }

    Ok(())
}
