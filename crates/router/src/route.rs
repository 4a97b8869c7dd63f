//! Route table and path resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-route metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    /// `Some(false)` marks the route (and everything below it) public.
    /// Unset means the route requires authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_auth: Option<bool>,
}

/// One entry of the route table, possibly with nested children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    /// `/abs`, `relative`, `''` (the parent itself), `:param` segments and a
    /// trailing `:name(.*)*` catch-all are supported.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub meta: RouteMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn requires_auth(mut self, value: bool) -> Self {
        self.meta.requires_auth = Some(value);
        self
    }

    /// Shorthand for `requires_auth(false)`
    pub fn public(self) -> Self {
        self.requires_auth(false)
    }

    pub fn redirect(mut self, to: &str) -> Self {
        self.redirect = Some(to.to_string());
        self
    }

    pub fn children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

/// The console's route table
pub fn default_routes() -> Vec<RouteRecord> {
    vec![
        RouteRecord::new("/").redirect("/dashboard"),
        RouteRecord::new("/login").name("Login").public(),
        RouteRecord::new("/dashboard").name("Dashboard").children(vec![
            RouteRecord::new("").name("DashboardHome"),
            RouteRecord::new("/systems").name("SystemManagement"),
            RouteRecord::new("/topics").name("TopicOverview"),
            RouteRecord::new("/groups").name("GroupManagement"),
            RouteRecord::new("/templates").name("PayloadTemplates"),
            RouteRecord::new("/topics/:id").name("TopicDetail"),
        ]),
        RouteRecord::new("/:pathMatch(.*)*")
            .name("NotFound")
            .redirect("/dashboard"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            Some(rest) => match rest.find('(') {
                Some(open) if rest[open..].starts_with("(.*)") => {
                    Segment::CatchAll(rest[..open].to_string())
                }
                Some(open) => Segment::Param(rest[..open].to_string()),
                None => Segment::Param(rest.to_string()),
            },
            None => Segment::Static(raw.to_string()),
        }
    }
}

/// The slice of a record that a resolved route carries along
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRecord {
    pub path: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
    pub redirect: Option<String>,
}

/// A concrete location resolved against the route table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoute {
    /// The normalized location, e.g. `/topics/42`
    pub path: String,
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
    /// Root-first chain of matched records; the last one is the leaf
    pub matched: Vec<MatchedRecord>,
}

impl ResolvedRoute {
    /// True unless some record in the chain opts out of authentication.
    pub fn requires_auth(&self) -> bool {
        !self
            .matched
            .iter()
            .any(|record| record.meta.requires_auth == Some(false))
    }

    /// The leaf record's static redirect, if any
    pub fn redirect(&self) -> Option<&str> {
        self.matched.last().and_then(|record| record.redirect.as_deref())
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    segments: Vec<Segment>,
    chain: Vec<MatchedRecord>,
}

impl CompiledRoute {
    fn matches(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::CatchAll(name) => {
                    params.insert(name.clone(), parts[index..].join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if parts.get(index) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(index)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
            index += 1;
        }

        (index == parts.len()).then_some(params)
    }
}

/// Flattened, ordered route table.
///
/// Children are tried before their parent and siblings in definition order;
/// the first match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn new(records: &[RouteRecord]) -> Self {
        let mut routes = Vec::new();
        for record in records {
            compile(record, "", &[], &mut routes);
        }
        Self { routes }
    }

    /// Parse a route table from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<RouteRecord> = serde_json::from_str(json)?;
        Ok(Self::new(&records))
    }

    pub fn resolve(&self, location: &str) -> Option<ResolvedRoute> {
        let path = normalize_path(location);
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        self.routes.iter().find_map(|route| {
            route.matches(&parts).map(|params| ResolvedRoute {
                path: path.clone(),
                name: route.chain.last().and_then(|record| record.name.clone()),
                params,
                matched: route.chain.clone(),
            })
        })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(&default_routes())
    }
}

fn compile(
    record: &RouteRecord,
    parent: &str,
    chain: &[MatchedRecord],
    out: &mut Vec<CompiledRoute>,
) {
    let full_path = join_path(parent, &record.path);

    let mut chain = chain.to_vec();
    chain.push(MatchedRecord {
        path: full_path.clone(),
        name: record.name.clone(),
        meta: record.meta.clone(),
        redirect: record.redirect.clone(),
    });

    for child in &record.children {
        compile(child, &full_path, &chain, out);
    }

    out.push(CompiledRoute {
        segments: full_path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(Segment::parse)
            .collect(),
        chain,
    });
}

fn join_path(parent: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize_path(path)
    } else if path.is_empty() {
        normalize_path(parent)
    } else {
        normalize_path(&format!("{}/{}", parent.trim_end_matches('/'), path))
    }
}

/// Strip query and fragment, collapse duplicate and trailing slashes.
pub fn normalize_path(location: &str) -> String {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let parts: Vec<&str> = location[..end].split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/topics/"), "/topics");
        assert_eq!(normalize_path("topics//42?tab=payload#top"), "/topics/42");
    }

    #[test]
    fn test_absolute_child_keeps_parent_chain() {
        let table = RouteTable::default();
        let route = table.resolve("/topics").unwrap();

        assert_eq!(route.name.as_deref(), Some("TopicOverview"));
        let chain: Vec<_> = route.matched.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(chain, vec!["/dashboard", "/topics"]);
        assert!(route.requires_auth());
    }

    #[test]
    fn test_empty_child_matches_parent_path() {
        let route = RouteTable::default().resolve("/dashboard").unwrap();
        assert_eq!(route.name.as_deref(), Some("DashboardHome"));
        assert_eq!(route.matched.len(), 2);
    }

    #[test]
    fn test_param_capture() {
        let route = RouteTable::default().resolve("/topics/42").unwrap();
        assert_eq!(route.name.as_deref(), Some("TopicDetail"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_catch_all_redirects() {
        let route = RouteTable::default().resolve("/no/such/page").unwrap();
        assert_eq!(route.name.as_deref(), Some("NotFound"));
        assert_eq!(route.params.get("pathMatch").map(String::as_str), Some("no/such/page"));
        assert_eq!(route.redirect(), Some("/dashboard"));
    }

    #[test]
    fn test_login_is_public() {
        let route = RouteTable::default().resolve("/login").unwrap();
        assert!(!route.requires_auth());
    }

    #[test]
    fn test_public_parent_covers_children() {
        let table = RouteTable::new(&[RouteRecord::new("/docs")
            .public()
            .children(vec![RouteRecord::new("topics/:id").name("PublicDoc")])]);

        let route = table.resolve("/docs/topics/7").unwrap();
        assert_eq!(route.name.as_deref(), Some("PublicDoc"));
        assert!(!route.requires_auth());
    }

    #[test]
    fn test_no_match_without_catch_all() {
        let table = RouteTable::new(&[RouteRecord::new("/login").public()]);
        assert!(table.resolve("/topics").is_none());
    }

    #[test]
    fn test_from_json() {
        let table = RouteTable::from_json(
            r#"[
                { "path": "/login", "name": "Login", "meta": { "requiresAuth": false } },
                { "path": "/topics", "name": "TopicOverview" }
            ]"#,
        )
        .unwrap();

        assert!(!table.resolve("/login").unwrap().requires_auth());
        assert!(table.resolve("/topics").unwrap().requires_auth());
    }
}
