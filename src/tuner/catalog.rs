use crate::db::PlanRow;
use crate::tuner::action::Action;
use std::collections::HashSet;

/// Per-table candidate column sets for a known schema, plus the fallback
/// lists used when the plan yields nothing usable. Iteration order is fixed
/// so catalog construction is reproducible.
#[derive(Debug, Clone)]
pub struct CandidateRules {
    tables: Vec<TableCandidates>,
    static_fallback: Vec<(String, Vec<String>)>,
    generic_fallback: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone)]
struct TableCandidates {
    table: String,
    column_sets: Vec<Vec<String>>,
}

impl CandidateRules {
    pub fn new(
        tables: Vec<(&str, Vec<Vec<&str>>)>,
        static_fallback: Vec<(&str, Vec<&str>)>,
        generic_fallback: Vec<(&str, Vec<&str>)>,
    ) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|(table, sets)| TableCandidates {
                    table: table.to_string(),
                    column_sets: sets
                        .into_iter()
                        .map(|cols| cols.into_iter().map(str::to_string).collect())
                        .collect(),
                })
                .collect(),
            static_fallback: owned_pairs(static_fallback),
            generic_fallback: owned_pairs(generic_fallback),
        }
    }

    /// Rule table for the e-commerce benchmark schema.
    pub fn ecommerce() -> Self {
        Self::new(
            vec![
                ("users", vec![vec!["city"], vec!["age"], vec!["city", "age"]]),
                (
                    "sessions",
                    vec![
                        vec!["user_id"],
                        vec!["user_id", "created_at"],
                        vec!["session_type"],
                    ],
                ),
                (
                    "orders",
                    vec![
                        vec!["user_id"],
                        vec!["user_id", "status"],
                        vec!["created_at"],
                    ],
                ),
                ("order_items", vec![vec!["order_id"], vec!["product_id"]]),
                ("products", vec![vec!["category"], vec!["category", "price"]]),
            ],
            vec![
                ("users", vec!["city"]),
                ("users", vec!["age"]),
                ("users", vec!["city", "age"]),
                ("orders", vec!["user_id"]),
                ("orders", vec!["user_id", "status"]),
                ("orders", vec!["created_at"]),
                ("order_items", vec!["order_id"]),
                ("order_items", vec!["product_id"]),
                ("products", vec!["category"]),
                ("products", vec!["category", "price"]),
            ],
            vec![
                ("users", vec!["city"]),
                ("sessions", vec!["user_id"]),
                ("orders", vec!["user_id"]),
            ],
        )
    }

    fn candidates_for(&self, table: &str) -> Option<&[Vec<String>]> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.column_sets.as_slice())
    }
}

fn owned_pairs(pairs: Vec<(&str, Vec<&str>)>) -> Vec<(String, Vec<String>)> {
    pairs
        .into_iter()
        .map(|(table, cols)| {
            (
                table.to_string(),
                cols.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

/// The ordered, deduplicated list of candidate actions for one query.
///
/// Built once per environment and never mutated afterwards. Index 0 is
/// always `Action::NoOp`.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    actions: Vec<Action>,
}

impl ActionCatalog {
    /// Derive the catalog from a query's plan rows.
    ///
    /// Empty plan rows (inspection failed or returned nothing) fall back to
    /// the static schema-wide candidate list. Plan rows that match no known
    /// table fall back to the small generic list. Everything is bounded by
    /// `max_actions` and deduplicated by (table, columns) for index
    /// creations and by index name for existing-key acknowledgements.
    pub fn build(plan_rows: &[PlanRow], rules: &CandidateRules, max_actions: usize) -> Self {
        let mut actions = vec![Action::NoOp];

        if plan_rows.is_empty() {
            tracing::debug!("no plan rows, using static default actions");
            for (table, cols) in &rules.static_fallback {
                if actions.len() >= max_actions {
                    break;
                }
                actions.push(Action::CreateIndex {
                    table: table.clone(),
                    columns: cols.clone(),
                });
            }
            return Self { actions };
        }

        let mut seen_indexes: HashSet<(String, Vec<String>)> = HashSet::new();
        let mut seen_keys: HashSet<String> = HashSet::new();

        for row in plan_rows {
            let Some(column_sets) = rules.candidates_for(&row.table) else {
                continue;
            };

            if let Some(key) = &row.access_key {
                if !seen_keys.contains(key) && actions.len() < max_actions {
                    seen_keys.insert(key.clone());
                    actions.push(Action::UseExisting {
                        index_name: key.clone(),
                    });
                }
            }

            for cols in column_sets {
                if actions.len() >= max_actions {
                    break;
                }
                let identity = (row.table.clone(), cols.clone());
                if seen_indexes.contains(&identity) {
                    continue;
                }
                seen_indexes.insert(identity);
                actions.push(Action::CreateIndex {
                    table: row.table.clone(),
                    columns: cols.clone(),
                });
            }
        }

        // Plan rows existed but none matched a known table.
        if actions.len() == 1 {
            tracing::debug!("plan matched no known tables, adding generic fallback");
            for (table, cols) in &rules.generic_fallback {
                if actions.len() >= max_actions {
                    break;
                }
                actions.push(Action::CreateIndex {
                    table: table.clone(),
                    columns: cols.clone(),
                });
            }
        }

        Self { actions }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_row(table: &str, key: Option<&str>) -> PlanRow {
        PlanRow {
            table: table.to_string(),
            access_key: key.map(str::to_string),
            estimated_rows: 1000,
        }
    }

    #[test]
    fn index_zero_is_always_noop() {
        let rules = CandidateRules::ecommerce();
        let from_plan = ActionCatalog::build(&[plan_row("users", None)], &rules, 12);
        let from_fallback = ActionCatalog::build(&[], &rules, 12);
        assert_eq!(from_plan.get(0), Some(&Action::NoOp));
        assert_eq!(from_fallback.get(0), Some(&Action::NoOp));
    }

    #[test]
    fn empty_plan_uses_static_fallback() {
        let rules = CandidateRules::ecommerce();
        let catalog = ActionCatalog::build(&[], &rules, 12);
        // NoOp + the ten static candidates.
        assert_eq!(catalog.len(), 11);
        assert_eq!(
            catalog.get(1),
            Some(&Action::create_index("users", &["city"]))
        );
    }

    #[test]
    fn known_table_yields_its_candidate_sets() {
        let rules = CandidateRules::ecommerce();
        let catalog = ActionCatalog::build(&[plan_row("users", None)], &rules, 12);
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.actions()[1..],
            [
                Action::create_index("users", &["city"]),
                Action::create_index("users", &["age"]),
                Action::create_index("users", &["city", "age"]),
            ]
        );
    }

    #[test]
    fn existing_key_becomes_use_existing_action() {
        let rules = CandidateRules::ecommerce();
        let catalog =
            ActionCatalog::build(&[plan_row("users", Some("idx_users_city"))], &rules, 12);
        assert_eq!(
            catalog.get(1),
            Some(&Action::UseExisting {
                index_name: "idx_users_city".into()
            })
        );
    }

    #[test]
    fn duplicate_tables_and_keys_are_deduplicated() {
        let rules = CandidateRules::ecommerce();
        let catalog = ActionCatalog::build(
            &[
                plan_row("users", Some("idx_users_city")),
                plan_row("users", Some("idx_users_city")),
            ],
            &rules,
            12,
        );
        // NoOp + 1 existing + 3 user candidates, nothing doubled.
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn catalog_never_exceeds_max_actions() {
        let rules = CandidateRules::ecommerce();
        let many_rows: Vec<PlanRow> = ["users", "sessions", "orders", "order_items", "products"]
            .iter()
            .map(|t| plan_row(t, None))
            .collect();
        for max in 1..8 {
            let catalog = ActionCatalog::build(&many_rows, &rules, max);
            assert!(catalog.len() <= max);
            let fallback = ActionCatalog::build(&[], &rules, max);
            assert!(fallback.len() <= max);
        }
    }

    #[test]
    fn unknown_tables_fall_back_to_generic_list() {
        let rules = CandidateRules::ecommerce();
        let catalog = ActionCatalog::build(&[plan_row("audit_log", None)], &rules, 12);
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.get(1),
            Some(&Action::create_index("users", &["city"]))
        );
        assert_eq!(
            catalog.get(2),
            Some(&Action::create_index("sessions", &["user_id"]))
        );
    }

    #[test]
    fn no_two_create_index_actions_share_identity() {
        let rules = CandidateRules::ecommerce();
        let rows: Vec<PlanRow> = ["users", "users", "orders", "orders"]
            .iter()
            .map(|t| plan_row(t, None))
            .collect();
        let catalog = ActionCatalog::build(&rows, &rules, 12);
        let mut identities = HashSet::new();
        for action in catalog.actions() {
            if let Action::CreateIndex { table, columns } = action {
                assert!(identities.insert((table.clone(), columns.clone())));
            }
        }
    }

    #[test]
    fn construction_is_deterministic() {
        let rules = CandidateRules::ecommerce();
        let rows = [plan_row("orders", Some("pk_orders")), plan_row("users", None)];
        let a = ActionCatalog::build(&rows, &rules, 12);
        let b = ActionCatalog::build(&rows, &rules, 12);
        assert_eq!(a.actions(), b.actions());
    }
}
