use rh_domain::config::ResolverConfig;
use rh_domain::trace::TraceEvent;
use rh_staffing::RosterEntry;
use serde::Serialize;

use crate::lsh::LshIndex;
use crate::minhash::MinHasher;
use crate::score::weighted_ratio;

/// One roster row that can be searched by name.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeIndexEntry {
    pub id: String,
    pub display_name: String,
}

/// A scored candidate, shaped the way the search tool reports it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeMatch {
    #[serde(rename = "search_match_score")]
    pub score: f64,
    #[serde(rename = "employee_identifier")]
    pub id: String,
    #[serde(rename = "employee_name")]
    pub name: String,
}

/// A query made only of ASCII digits is an employee id.
pub fn is_employee_id(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}

/// MinHash + LSH index over one roster snapshot. Built per query and
/// dropped afterwards.
#[derive(Debug, Clone)]
pub struct EmployeeIndex {
    hasher: MinHasher,
    lsh: LshIndex,
    entries: Vec<EmployeeIndexEntry>,
    max_results: usize,
}

impl EmployeeIndex {
    /// Index every roster row with a name. Rows without one are skipped.
    pub fn build(roster: &[RosterEntry], cfg: &ResolverConfig) -> Self {
        let hasher = MinHasher::new(cfg.num_perm, cfg.shingle_size, cfg.seed);
        let mut lsh = LshIndex::new(cfg.threshold, cfg.num_perm);
        let mut entries = Vec::with_capacity(roster.len());

        for row in roster {
            let Some(name) = row.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
            else {
                tracing::debug!(employee_id = row.id, "roster row without a name, not indexed");
                continue;
            };
            lsh.insert(&hasher.signature(name));
            entries.push(EmployeeIndexEntry {
                id: row.id.to_string(),
                display_name: name.to_owned(),
            });
        }

        Self {
            hasher,
            lsh,
            entries,
            max_results: cfg.max_results,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[EmployeeIndexEntry] {
        &self.entries
    }

    /// LSH candidates rescored by [`weighted_ratio`], best first. Ties
    /// keep roster order. An empty result means nothing resolvable.
    pub fn search(&self, query: &str) -> Vec<EmployeeMatch> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let candidates = self.lsh.query(&self.hasher.signature(query));
        let mut scored: Vec<EmployeeMatch> = candidates
            .iter()
            .filter_map(|&pos| self.entries.get(pos))
            .map(|e| EmployeeMatch {
                score: weighted_ratio(&e.display_name, query),
                id: e.id.clone(),
                name: e.display_name.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.max_results);

        TraceEvent::ResolverQuery {
            numeric: false,
            roster_size: self.entries.len(),
            candidates: candidates.len(),
            returned: scored.len(),
        }
        .emit();

        scored
    }
}

/// Result of an id lookup: the id itself with a perfect score, or
/// nothing when the employee is unknown.
pub fn id_match(query: &str, name: Option<String>) -> Vec<EmployeeMatch> {
    let out: Vec<EmployeeMatch> = name
        .map(|name| EmployeeMatch {
            score: 100.0,
            id: query.to_owned(),
            name,
        })
        .into_iter()
        .collect();

    TraceEvent::ResolverQuery {
        numeric: true,
        roster_size: 0,
        candidates: out.len(),
        returned: out.len(),
    }
    .emit();

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<RosterEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| RosterEntry {
                id: 100 + i as i64,
                full_name: Some((*n).to_owned()),
            })
            .collect()
    }

    #[test]
    fn numeric_detection() {
        assert!(is_employee_id("4021"));
        assert!(!is_employee_id("40a1"));
        assert!(!is_employee_id(""));
        assert!(!is_employee_id("John"));
    }

    #[test]
    fn id_match_is_single_perfect_score() {
        let out = id_match("4021", Some("Ann Lee".into()));
        assert_eq!(
            out,
            vec![EmployeeMatch {
                score: 100.0,
                id: "4021".into(),
                name: "Ann Lee".into()
            }]
        );
        assert!(id_match("4021", None).is_empty());
    }

    #[test]
    fn rows_without_names_are_skipped() {
        let mut rows = roster(&["Ann Lee"]);
        rows.push(RosterEntry {
            id: 7,
            full_name: None,
        });
        rows.push(RosterEntry {
            id: 8,
            full_name: Some("   ".into()),
        });
        let index = EmployeeIndex::build(&rows, &ResolverConfig::default());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let index = EmployeeIndex::build(&roster(&["Ann Lee"]), &ResolverConfig::default());
        assert!(index.search("   ").is_empty());
    }

    #[test]
    fn results_are_capped() {
        let names: Vec<String> = (0..30).map(|i| format!("Maria Lopez {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let index = EmployeeIndex::build(&roster(&refs), &ResolverConfig::default());
        let out = index.search("Maria Lopez");
        assert_eq!(out.len(), 10);
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn match_serializes_with_tool_field_names() {
        let m = EmployeeMatch {
            score: 90.0,
            id: "7".into(),
            name: "Ann Lee".into(),
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["employee_name"], "Ann Lee");
        assert_eq!(v["employee_identifier"], "7");
        assert_eq!(v["search_match_score"], 90.0);
    }
}
