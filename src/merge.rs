//! Proxy Merge Engine
//!
//! Combines the proxy lists of every resolved source into one accumulator,
//! applying the scheme's deduplication mode and name-conflict resolution.
//! Sources are resolved concurrently but merged strictly in scheme config
//! order, so rename disambiguation is reproducible.

use tracing::debug;

use crate::model::{AggregateRule, ConflictResolution, Deduplication, Proxy};

/// Merge one source's proxies into the accumulator, in source order.
pub fn merge_proxies(
    all_proxies: &mut Vec<Proxy>,
    incoming: Vec<Proxy>,
    rule: &AggregateRule,
    source_name: &str,
) {
    for mut proxy in incoming {
        let existing_index = find_existing_proxy(all_proxies, &proxy, rule.deduplication);
        // A name collision the dedup mode itself would not treat as a
        // duplicate (e.g. same name on a different server under by_server)
        // still needs a rename.
        let has_name_conflict = all_proxies.iter().any(|p| p.name == proxy.name);

        if let Some(index) = existing_index {
            match rule.name_conflict_resolve {
                ConflictResolution::Skip => {
                    debug!("skipping duplicate proxy '{}' from {}", proxy.name, source_name);
                    continue;
                }
                ConflictResolution::Override => {
                    // Keeps the incoming proxy's own name even if that leaves
                    // a duplicate elsewhere in the list; matches upstream
                    // passthrough behavior.
                    all_proxies[index] = proxy;
                    continue;
                }
                ConflictResolution::Rename => {}
            }
        }

        if rule.name_conflict_resolve == ConflictResolution::Rename
            && (existing_index.is_some() || has_name_conflict)
        {
            proxy.name = generate_unique_name(all_proxies, &proxy.name, source_name);
        }

        all_proxies.push(proxy);
    }
}

/// Index of the accumulator entry the incoming proxy duplicates, per the
/// scheme's deduplication mode.
fn find_existing_proxy(
    all_proxies: &[Proxy],
    proxy: &Proxy,
    deduplication: Deduplication,
) -> Option<usize> {
    match deduplication {
        Deduplication::None => None,
        Deduplication::ByName => all_proxies.iter().position(|p| p.name == proxy.name),
        Deduplication::ByServer => all_proxies
            .iter()
            .position(|p| p.server == proxy.server && p.port == proxy.port),
    }
}

/// Build a display name that is not yet taken: `"<name>[<source>]"`, then
/// `_1`, `_2`, ... suffixes until free.
pub fn generate_unique_name(all_proxies: &[Proxy], original_name: &str, source_name: &str) -> String {
    let base_name = format!("{}[{}]", original_name, source_name);
    let mut unique_name = base_name.clone();
    let mut counter = 1;

    while all_proxies.iter().any(|p| p.name == unique_name) {
        unique_name = format!("{}_{}", base_name, counter);
        counter += 1;
    }

    unique_name
}
