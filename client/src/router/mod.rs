//! Declarative route table and path matching.
//!
//! DESIGN
//! ======
//! Routes nest; a child's path is relative to its parent and every record on
//! the matched chain contributes its metadata (a parent's `requires_auth`
//! covers its children). Static segments outrank `:param` segments, so
//! `/articles/my` resolves to its own record even though `/articles/:id` is
//! declared first.


pub mod guard;

use std::collections::BTreeMap;

use crate::config::LOGIN_ROUTE;

const STATIC_SEGMENT_SCORE: u32 = 3;
const PARAM_SEGMENT_SCORE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub title: Option<&'static str>,
    pub requires_auth: bool,
    pub redirect: Option<&'static str>,
    pub children: Vec<Route>,
}

impl Route {
    #[must_use]
    pub fn page(path: &'static str, title: &'static str) -> Self {
        Self { path, name: None, title: Some(title), requires_auth: false, redirect: None, children: Vec::new() }
    }

    #[must_use]
    pub fn redirect(path: &'static str, to: &'static str) -> Self {
        Self { path, name: None, title: None, requires_auth: false, redirect: Some(to), children: Vec::new() }
    }

    #[must_use]
    pub fn group(path: &'static str, children: Vec<Route>) -> Self {
        Self { path, name: None, title: None, requires_auth: false, redirect: None, children }
    }

    #[must_use]
    pub fn auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
}

/// The application's routes.
#[must_use]
pub fn app_routes() -> Vec<Route> {
    vec![
        Route::redirect("/", LOGIN_ROUTE),
        Route::page(LOGIN_ROUTE, "Log in"),
        Route::page("/register", "Register"),
        Route::page("/home", "Home").auth(),
        Route::page("/ai", "AI").auth(),
        Route::page("/essay", "Essay").auth(),
        Route::page("/about", "About me").auth(),
        Route::page("/articles", "Articles").auth(),
        Route::page("/articles/create", "New article").auth(),
        Route::page("/articles/edit/:id", "Edit article").auth(),
        Route::page("/articles/:id", "Article").auth(),
        Route::page("/articles/my", "My articles").auth(),
        Route::page("/admin/articles/review", "Article review").auth(),
        Route::group(
            "/tools",
            vec![
                Route::page("compress", "Batch compress").auth(),
                Route::page("unzip", "Batch extract").auth(),
                Route::page("bili", "Bilibili lookup").auth(),
                Route::page("market", "Market quotes").auth(),
                Route::page("weather", "Weather").auth(),
                Route::page("network", "Network").auth(),
                Route::page("sparkai", "AI chat").auth().named("SparkAI"),
            ],
        )
        .auth(),
    ]
}

/// One record on a matched chain, root first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchedRecord {
    pub full_path: String,
    pub name: Option<&'static str>,
    pub title: Option<&'static str>,
    pub requires_auth: bool,
    pub redirect: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    /// Normalized requested path (no query, no trailing slash).
    pub path: String,
    pub query: Option<String>,
    pub records: Vec<MatchedRecord>,
    pub params: BTreeMap<String, String>,
}

impl RouteMatch {
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.records.iter().any(|r| r.requires_auth)
    }

    #[must_use]
    pub fn leaf(&self) -> Option<&MatchedRecord> {
        self.records.last()
    }

    #[must_use]
    pub fn title(&self) -> Option<&'static str> {
        self.leaf().and_then(|r| r.title)
    }

    #[must_use]
    pub fn redirect(&self) -> Option<&'static str> {
        self.leaf().and_then(|r| r.redirect)
    }

    /// Path with its query string, as it would appear in the address bar.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Flattened candidate: a record plus its ancestors.
#[derive(Clone, Debug)]
struct Candidate {
    segments: Vec<String>,
    chain: Vec<MatchedRecord>,
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    candidates: Vec<Candidate>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: &[Route]) -> Self {
        let mut candidates = Vec::new();
        for route in routes {
            flatten(route, "", &[], &mut candidates);
        }
        Self { candidates }
    }

    /// Match `raw` (which may carry a query string or fragment) against the table.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<RouteMatch> {
        let (path, query) = split_location(raw);
        let segments = split_segments(&path);

        let mut best: Option<(u32, &Candidate, BTreeMap<String, String>)> = None;
        for candidate in &self.candidates {
            let Some((score, params)) = score_match(&candidate.segments, &segments) else {
                continue;
            };
            if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
                best = Some((score, candidate, params));
            }
        }
        best.map(|(_, candidate, params)| RouteMatch { path, query, records: candidate.chain.clone(), params })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(&app_routes())
    }
}

fn flatten(route: &Route, parent_path: &str, parent_chain: &[MatchedRecord], out: &mut Vec<Candidate>) {
    let full_path = join_path(parent_path, route.path);
    let mut chain = parent_chain.to_vec();
    chain.push(MatchedRecord {
        full_path: full_path.clone(),
        name: route.name,
        title: route.title,
        requires_auth: route.requires_auth,
        redirect: route.redirect,
    });
    out.push(Candidate { segments: split_segments(&full_path), chain: chain.clone() });
    for child in &route.children {
        flatten(child, &full_path, &chain, out);
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_owned();
    }
    let parent = parent.trim_end_matches('/');
    if child.is_empty() { parent.to_owned() } else { format!("{parent}/{child}") }
}

fn split_location(raw: &str) -> (String, Option<String>) {
    let without_fragment = raw.split_once('#').map_or(raw, |(p, _)| p);
    let (path, query) = match without_fragment.split_once('?') {
        Some((p, q)) => (p, Some(q.to_owned()).filter(|q| !q.is_empty())),
        None => (without_fragment, None),
    };
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() };
    let path = if path.starts_with('/') { path } else { format!("/{path}") };
    (path, query)
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

fn score_match(pattern: &[String], segments: &[String]) -> Option<(u32, BTreeMap<String, String>)> {
    if pattern.len() != segments.len() {
        return None;
    }
    let mut score = 0;
    let mut params = BTreeMap::new();
    for (pat, seg) in pattern.iter().zip(segments) {
        if let Some(name) = pat.strip_prefix(':') {
            params.insert(name.to_owned(), seg.clone());
            score += PARAM_SEGMENT_SCORE;
        } else if pat == seg {
            score += STATIC_SEGMENT_SCORE;
        } else {
            return None;
        }
    }
    Some((score, params))
}
