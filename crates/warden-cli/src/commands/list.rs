use warden_core::util;

use crate::commands::common::{
    entry_to_list_item, format_entry_lines, open_refreshed_registry, EntryListItem,
    RegistrySettings,
};
use crate::error::CliError;

pub async fn run_list(as_json: bool, settings: &RegistrySettings) -> Result<(), CliError> {
    let registry = open_refreshed_registry(settings).await?;
    let snapshot = registry.list().await;
    let now = util::now();

    if as_json {
        let json_items = snapshot
            .entries
            .iter()
            .map(|entry| entry_to_list_item(entry, now))
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if snapshot.is_empty() {
        println!("Whitelist is empty.");
    } else {
        for line in format_entry_lines(&snapshot, now) {
            println!("{line}");
        }
    }

    Ok(())
}
