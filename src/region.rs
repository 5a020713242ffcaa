//! Region Classifier
//!
//! Partitions the merged proxy list into geographic buckets by display-name
//! pattern. The table is fixed and ordered: the first matching entry wins,
//! regardless of how specific a later pattern would be.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::Proxy;

struct RegionPattern {
    name: &'static str,
    emoji: &'static str,
    pattern: Regex,
}

/// Group label for proxies matching no region pattern.
pub const OTHER_REGION_GROUP: &str = "🌐 其他";

fn region_patterns() -> &'static Vec<RegionPattern> {
    static PATTERNS: OnceLock<Vec<RegionPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: &[(&str, &str, &str)] = &[
            ("香港", "🇭🇰", r"香港|HK|Hong\s*Kong"),
            ("台湾", "🇹🇼", r"台湾|TW|Taiwan"),
            ("日本", "🇯🇵", r"日本|JP|Japan"),
            ("新加坡", "🇸🇬", r"新加坡|SG|Singapore"),
            ("美国", "🇺🇸", r"美国|US|United\s*States"),
            ("韩国", "🇰🇷", r"韩国|KR|Korea"),
            ("英国", "🇬🇧", r"英国|UK|United\s*Kingdom"),
            ("德国", "🇩🇪", r"德国|DE|Germany"),
            ("法国", "🇫🇷", r"法国|FR|France"),
            ("加拿大", "🇨🇦", r"加拿大|CA|Canada"),
            ("澳大利亚", "🇦🇺", r"澳大利亚|澳洲|AU|Australia"),
            ("印度", "🇮🇳", r"印度|IN|India"),
            ("俄罗斯", "🇷🇺", r"俄罗斯|RU|Russia"),
            ("土耳其", "🇹🇷", r"土耳其|TR|Turkey|Türkiye"),
            ("阿根廷", "🇦🇷", r"阿根廷|AR|Argentina"),
            ("巴西", "🇧🇷", r"巴西|BR|Brazil"),
            ("泰国", "🇹🇭", r"泰国|TH|Thailand"),
            ("印尼", "🇮🇩", r"印尼|印度尼西亚|ID|Indonesia"),
            ("菲律宾", "🇵🇭", r"菲律宾|PH|Philippines"),
            ("马来西亚", "🇲🇾", r"马来西亚|MY|Malaysia"),
        ];
        table
            .iter()
            .map(|(name, emoji, pattern)| RegionPattern {
                name,
                emoji,
                // The table is static; every pattern compiles.
                pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
            })
            .collect()
    })
}

/// Region buckets in table order plus the unmatched remainder.
#[derive(Debug, Default)]
pub struct RegionBuckets {
    /// `(group label, member names)` in first-match order of appearance.
    pub groups: Vec<(String, Vec<String>)>,
    pub unmatched: Vec<String>,
}

/// Classify proxies by display name. Ties between patterns resolve by table
/// order, not specificity.
pub fn classify_by_region(proxies: &[Proxy]) -> RegionBuckets {
    let mut buckets = RegionBuckets::default();

    for proxy in proxies {
        match region_patterns()
            .iter()
            .find(|r| r.pattern.is_match(&proxy.name))
        {
            Some(region) => {
                let group_name = format!("{} {}", region.emoji, region.name);
                match buckets.groups.iter_mut().find(|(name, _)| *name == group_name) {
                    Some((_, members)) => members.push(proxy.name.clone()),
                    None => buckets.groups.push((group_name, vec![proxy.name.clone()])),
                }
            }
            None => buckets.unmatched.push(proxy.name.clone()),
        }
    }

    buckets
}
