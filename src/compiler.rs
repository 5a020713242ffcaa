//! Routing-Policy Compiler
//!
//! Expands app/category routing intents into rule-provider definitions and
//! concrete RULE-SET entries, and collects the policy-group names the
//! assembler must synthesize.

use std::collections::{BTreeMap, HashSet};

use crate::catalog::{AppCatalog, UNCATEGORIZED_GROUP_KEY, UNCATEGORIZED_GROUP_LABEL};
use crate::model::{AppRouteRule, AvailableApp, RouteRuleKind, RuleProvider};

/// Reserved label routed to the built-in direct action.
pub const GLOBAL_DIRECT_LABEL: &str = "🎯 全球直连";
/// Reserved label routed to the built-in reject action.
pub const GLOBAL_BLOCK_LABEL: &str = "🛑 全球拦截";

/// Seconds between rule-provider refreshes.
const PROVIDER_REFRESH_INTERVAL: u64 = 86400;

/// Map the two reserved labels to built-in actions; everything else becomes
/// (or stays) a generated group name.
pub fn normalize_policy_target(group: &str) -> String {
    match group {
        GLOBAL_DIRECT_LABEL => "DIRECT".to_string(),
        GLOBAL_BLOCK_LABEL => "REJECT".to_string(),
        other => other.to_string(),
    }
}

/// Output of app-rule compilation.
#[derive(Debug, Default)]
pub struct CompiledRules {
    /// Rule-provider definitions keyed by app name.
    pub providers: BTreeMap<String, RuleProvider>,
    /// Concrete `RULE-SET,<app>,<target>` entries, in rule order.
    pub entries: Vec<String>,
    /// Distinct normalized policy targets, in first-seen order.
    pub group_names: Vec<String>,
}

fn rule_provider_for(app_name: &str) -> RuleProvider {
    RuleProvider {
        provider_type: "http".to_string(),
        behavior: "classical".to_string(),
        url: AppCatalog::rule_url(app_name),
        path: format!("./ruleset/{}.yaml", app_name),
        interval: PROVIDER_REFRESH_INTERVAL,
    }
}

/// Expand the scheme's routing intents against the app catalog.
///
/// Category rules route their members to the rule's group. App-level rules
/// route to a dedicated group named after the app itself, which the assembler
/// synthesizes like any other collected group name. Category expansion skips
/// apps that have their own app-level rule anywhere in the scheme.
pub fn compile_app_rules(rules: &[AppRouteRule], apps: &[AvailableApp]) -> CompiledRules {
    let mut compiled = CompiledRules::default();
    let mut seen_groups: HashSet<String> = HashSet::new();
    let mut add_group = |name: String, order: &mut Vec<String>| {
        if seen_groups.insert(name.clone()) {
            order.push(name);
        }
    };

    let app_level_names: HashSet<&str> = rules
        .iter()
        .filter(|r| r.kind != RouteRuleKind::Category)
        .map(|r| r.app_name.as_str())
        .collect();

    for rule in rules {
        match rule.kind {
            RouteRuleKind::Category => {
                let target = normalize_policy_target(&rule.group);
                let is_uncategorized = rule.app_name == UNCATEGORIZED_GROUP_LABEL
                    || rule.app_name == UNCATEGORIZED_GROUP_KEY;
                let in_category = apps.iter().filter(|app| {
                    if is_uncategorized {
                        app.default_group.is_none()
                    } else {
                        app.default_group.as_deref() == Some(rule.app_name.as_str())
                    }
                });
                for app in in_category {
                    if app_level_names.contains(app.name.as_str()) {
                        continue;
                    }
                    compiled
                        .providers
                        .insert(app.name.clone(), rule_provider_for(&app.name));
                    compiled
                        .entries
                        .push(format!("RULE-SET,{},{}", app.name, target));
                }
                add_group(target, &mut compiled.group_names);
            }
            RouteRuleKind::App => {
                let target = normalize_policy_target(&rule.app_name);
                compiled
                    .providers
                    .insert(rule.app_name.clone(), rule_provider_for(&rule.app_name));
                compiled
                    .entries
                    .push(format!("RULE-SET,{},{}", rule.app_name, target));
                add_group(target, &mut compiled.group_names);
            }
        }
    }

    compiled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, group: Option<&str>) -> AvailableApp {
        AvailableApp {
            name: name.to_string(),
            default_group: group.map(str::to_string),
        }
    }

    fn app_rule(name: &str, group: &str) -> AppRouteRule {
        AppRouteRule {
            app_name: name.to_string(),
            group: group.to_string(),
            kind: RouteRuleKind::App,
        }
    }

    fn category_rule(label: &str, group: &str) -> AppRouteRule {
        AppRouteRule {
            app_name: label.to_string(),
            group: group.to_string(),
            kind: RouteRuleKind::Category,
        }
    }

    #[test]
    fn app_rule_produces_provider_and_entry() {
        let compiled = compile_app_rules(&[app_rule("OpenAI", "🤖 AI 服务")], &[]);
        assert_eq!(compiled.entries, vec!["RULE-SET,OpenAI,OpenAI"]);
        let provider = compiled.providers.get("OpenAI").unwrap();
        assert_eq!(provider.provider_type, "http");
        assert_eq!(provider.behavior, "classical");
        assert!(provider.url.ends_with("/OpenAI/OpenAI.yaml"));
        assert_eq!(provider.path, "./ruleset/OpenAI.yaml");
        assert_eq!(compiled.group_names, vec!["OpenAI"]);
    }

    #[test]
    fn app_rule_routes_to_a_group_named_after_the_app() {
        // An app-level rule gets its own per-app group regardless of the
        // group field on the rule.
        let compiled = compile_app_rules(&[app_rule("Baidu", GLOBAL_DIRECT_LABEL)], &[]);
        assert_eq!(compiled.entries, vec!["RULE-SET,Baidu,Baidu"]);
        assert_eq!(compiled.group_names, vec!["Baidu"]);
    }

    #[test]
    fn reserved_labels_normalize_to_builtin_actions() {
        let apps = vec![
            app("Baidu", Some("🏠 国内直连")),
            app("Tracker", Some("🛑 广告")),
        ];
        let compiled = compile_app_rules(
            &[
                category_rule("🏠 国内直连", GLOBAL_DIRECT_LABEL),
                category_rule("🛑 广告", GLOBAL_BLOCK_LABEL),
            ],
            &apps,
        );
        assert_eq!(
            compiled.entries,
            vec!["RULE-SET,Baidu,DIRECT", "RULE-SET,Tracker,REJECT"]
        );
        assert_eq!(compiled.group_names, vec!["DIRECT", "REJECT"]);
    }

    #[test]
    fn category_rule_expands_to_member_apps() {
        let apps = vec![
            app("OpenAI", Some("🤖 AI 服务")),
            app("Claude", Some("🤖 AI 服务")),
            app("Steam", Some("🎮 游戏平台")),
        ];
        let compiled =
            compile_app_rules(&[category_rule("🤖 AI 服务", "🔰 节点选择")], &apps);
        assert_eq!(
            compiled.entries,
            vec![
                "RULE-SET,OpenAI,🔰 节点选择",
                "RULE-SET,Claude,🔰 节点选择"
            ]
        );
        assert!(compiled.providers.contains_key("OpenAI"));
        assert!(!compiled.providers.contains_key("Steam"));
    }

    #[test]
    fn app_level_rule_wins_over_category_expansion() {
        // Scenario D: OpenAI has its own app-level rule, so the AI category
        // expands to every other AI app but not OpenAI.
        let apps = vec![
            app("OpenAI", Some("🤖 AI 服务")),
            app("Claude", Some("🤖 AI 服务")),
            app("Gemini", Some("🤖 AI 服务")),
        ];
        let compiled = compile_app_rules(
            &[
                category_rule("🤖 AI 服务", "🔰 节点选择"),
                app_rule("OpenAI", "🇺🇸 美国"),
            ],
            &apps,
        );

        let category_entries: Vec<&String> = compiled
            .entries
            .iter()
            .filter(|e| e.ends_with("🔰 节点选择"))
            .collect();
        assert_eq!(
            category_entries,
            vec!["RULE-SET,Claude,🔰 节点选择", "RULE-SET,Gemini,🔰 节点选择"]
        );
        // OpenAI routes through its own per-app group instead.
        assert!(compiled.entries.contains(&"RULE-SET,OpenAI,OpenAI".to_string()));
        assert_eq!(compiled.group_names, vec!["🔰 节点选择", "OpenAI"]);
    }

    #[test]
    fn uncategorized_sentinel_matches_apps_without_category() {
        let apps = vec![app("Obscure", None), app("OpenAI", Some("🤖 AI 服务"))];
        for label in [UNCATEGORIZED_GROUP_LABEL, UNCATEGORIZED_GROUP_KEY] {
            let compiled = compile_app_rules(&[category_rule(label, "DIRECT")], &apps);
            assert_eq!(compiled.entries, vec!["RULE-SET,Obscure,DIRECT"]);
        }
    }

    #[test]
    fn group_names_are_deduplicated_in_order() {
        let apps = vec![
            app("OpenAI", Some("🤖 AI 服务")),
            app("Steam", Some("🎮 游戏平台")),
        ];
        let compiled = compile_app_rules(
            &[
                category_rule("🤖 AI 服务", "🔰 节点选择"),
                category_rule("🎮 游戏平台", "🔰 节点选择"),
                app_rule("Claude", "🤖 AI 服务"),
                app_rule("Claude", "🎮 游戏平台"),
            ],
            &apps,
        );
        assert_eq!(compiled.group_names, vec!["🔰 节点选择", "Claude"]);
    }
}
