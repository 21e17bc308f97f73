//! Citation linking
//!
//! Links an opinion to the opinions it cites: citations are extracted from
//! the opinion text and matched against the corpus, then the rendered text is
//! rewritten with citation links, the outgoing edge set is replaced and the
//! citation counts of newly cited clusters are bumped.
//!
//! Matching is read-only and runs to completion before anything is written,
//! so a transient matcher failure retries the whole document from a clean
//! slate.

use crate::citation::Citation;
use crate::document::{
    AggregateStore, CitedTarget, Document, DocumentId, DocumentStore, TargetLookup,
};
use crate::errors::LinkError;
use crate::extract::CitationExtractor;
use crate::html::create_cited_html;
use crate::matcher::{CitationMatcher, MatchOutcome};
use crate::parallel::{identify_parallel_citations, PARALLEL_DISTANCE};
use caselink_common::metrics::{record_document_failed, record_document_linked};
use caselink_common::retry::{retry_transient, RetryPolicy};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of linking one opinion
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub document_id: DocumentId,
    /// Extracted citations, annotated with their targets where resolved
    pub citations: Vec<Citation>,
    pub citations_found: usize,
    pub citations_resolved: usize,
    /// Outgoing edges after the run
    pub cited_ids: BTreeSet<DocumentId>,
    /// Targets whose citation count was incremented
    pub newly_cited: usize,
    pub parallel_groups: usize,
    pub attempts: u32,
}

/// Outcome of linking a batch of opinions
#[derive(Debug, Default)]
pub struct LinkReport {
    pub linked: Vec<DocumentReport>,
    /// Requested ids with no stored opinion
    pub missing: Vec<DocumentId>,
    pub failed: Vec<(DocumentId, LinkError)>,
}

impl LinkReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read-only result of matching every citation of a document
struct Resolution {
    citations: Vec<Citation>,
    previously_cited: BTreeSet<DocumentId>,
    targets: BTreeMap<DocumentId, CitedTarget>,
}

/// Extracts, matches and persists citations of opinions
pub struct CitationLinker {
    extractor: Arc<dyn CitationExtractor>,
    matcher: Arc<dyn CitationMatcher>,
    documents: Arc<dyn DocumentStore>,
    aggregates: Arc<dyn AggregateStore>,
    retry: RetryPolicy,
    parallel_distance: usize,
}

impl CitationLinker {
    pub fn new(
        extractor: Arc<dyn CitationExtractor>,
        matcher: Arc<dyn CitationMatcher>,
        documents: Arc<dyn DocumentStore>,
        aggregates: Arc<dyn AggregateStore>,
    ) -> Self {
        Self {
            extractor,
            matcher,
            documents,
            aggregates,
            retry: RetryPolicy::default(),
            parallel_distance: PARALLEL_DISTANCE,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_parallel_distance(mut self, distance: usize) -> Self {
        self.parallel_distance = distance;
        self
    }

    /// Link every stored opinion among `ids`.
    ///
    /// Opinions are independent: one failing does not stop the others. Only a
    /// failure to load the batch is returned as an error.
    pub async fn link_documents(
        &self,
        ids: &[DocumentId],
        index: bool,
    ) -> Result<LinkReport, LinkError> {
        let documents = self.documents.load_documents(ids).await?;

        let loaded: BTreeSet<DocumentId> = documents.iter().map(|d| d.id).collect();
        let mut report = LinkReport {
            missing: ids.iter().copied().filter(|id| !loaded.contains(id)).collect(),
            ..Default::default()
        };
        for id in &report.missing {
            warn!(document_id = id, "Opinion not found, skipping");
        }

        for document in &documents {
            match self.link_document(document, index).await {
                Ok(linked) => report.linked.push(linked),
                Err(e) => {
                    error!(document_id = document.id, error = %e, "Citation linking failed");
                    record_document_failed(e.reason());
                    report.failed.push((document.id, e));
                }
            }
        }

        Ok(report)
    }

    /// Link one opinion, retrying while the matcher reports it is not ready
    #[instrument(skip(self, document), fields(document_id = document.id))]
    pub async fn link_document(
        &self,
        document: &Document,
        index: bool,
    ) -> Result<DocumentReport, LinkError> {
        let start = Instant::now();

        let retried = retry_transient(
            &self.retry,
            "link_document",
            || self.resolve(document),
            LinkError::is_transient,
        )
        .await
        .map_err(|e| LinkError::from_retry(document.id, e))?;
        let resolution = retried.value;

        let newly_cited = self.apply(document, &resolution, index).await?;

        let citations_found = resolution.citations.len();
        let citations_resolved = resolution
            .citations
            .iter()
            .filter(|c| c.is_resolved())
            .count();
        let parallel_groups =
            identify_parallel_citations(&resolution.citations, self.parallel_distance).len();

        record_document_linked(
            start.elapsed().as_secs_f64(),
            citations_found,
            citations_resolved,
        );
        info!(
            citations_found,
            citations_resolved,
            newly_cited,
            parallel_groups,
            attempts = retried.attempts,
            "Opinion linked"
        );

        Ok(DocumentReport {
            document_id: document.id,
            cited_ids: resolution.targets.keys().copied().collect(),
            citations: resolution.citations,
            citations_found,
            citations_resolved,
            newly_cited,
            parallel_groups,
            attempts: retried.attempts,
        })
    }

    async fn resolve(&self, document: &Document) -> Result<Resolution, LinkError> {
        let mut citations = match document.source_text() {
            Some(source) => self.extractor.extract(source.body, source.format.is_html()),
            None => Vec::new(),
        };
        let previously_cited = self.documents.cited_ids(document.id).await?;
        let mut targets = BTreeMap::new();

        for citation in citations.iter_mut() {
            match self.matcher.match_citation(citation, document).await? {
                MatchOutcome::SingleMatch(id) => match self.documents.lookup_target(id).await? {
                    TargetLookup::Found(target) => {
                        citation.resolve(target.url.clone(), target.id);
                        targets.insert(target.id, target);
                    }
                    TargetLookup::Missing => {
                        warn!(citation = %citation, matched_id = id, "Matched opinion no longer exists");
                    }
                    TargetLookup::Ambiguous(count) => {
                        warn!(citation = %citation, matched_id = id, count, "Matched id is ambiguous");
                    }
                },
                MatchOutcome::NoMatch => {
                    debug!(citation = %citation, "No match");
                }
                MatchOutcome::AmbiguousMatch(ids) => {
                    debug!(citation = %citation, candidates = ids.len(), "Several matches, leaving unlinked");
                }
            }
        }

        Ok(Resolution {
            citations,
            previously_cited,
            targets,
        })
    }

    /// Persist a resolution. Returns the number of incremented targets.
    ///
    /// The edge set is replaced before any count is incremented, so a failed
    /// run can under-count a pair but never count it twice. A document with
    /// no extracted citations keeps its previous edges and rendered text, so
    /// the edge set is only replaced while the text still cites something.
    async fn apply(
        &self,
        document: &Document,
        resolution: &Resolution,
        index: bool,
    ) -> Result<usize, LinkError> {
        let mut updated = document.clone();
        if !resolution.citations.is_empty() {
            if let Some(source) = document.source_text() {
                updated.html_with_citations =
                    Some(create_cited_html(source, &resolution.citations)?);
            }

            let cited: BTreeSet<DocumentId> = resolution.targets.keys().copied().collect();
            self.documents.replace_cited(document.id, &cited).await?;
        }

        let newly_cited: Vec<&CitedTarget> = resolution
            .targets
            .values()
            .filter(|target| !resolution.previously_cited.contains(&target.id))
            .collect();
        for target in &newly_cited {
            self.aggregates
                .increment_citation_count(target, index)
                .await?;
        }

        self.documents.save_document(&updated, index).await?;

        Ok(newly_cited.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MatchError;
    use crate::extract::ReporterExtractor;
    use async_trait::async_trait;
    use caselink_common::errors::AppError;
    use caselink_common::Result as StoreResult;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const CITING: DocumentId = 1;
    const CITING_CLUSTER: i64 = 100;

    /// Returns the same citations for every text
    struct FixedExtractor(Vec<Citation>);

    impl CitationExtractor for FixedExtractor {
        fn extract(&self, _text: &str, _is_html: bool) -> Vec<Citation> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct FakeMatcher {
        outcomes: HashMap<String, MatchOutcome>,
        transient_failures: AtomicU32,
        permanent: bool,
        calls: AtomicU32,
    }

    impl FakeMatcher {
        fn with(mut self, citation: &str, outcome: MatchOutcome) -> Self {
            self.outcomes.insert(citation.to_string(), outcome);
            self
        }

        fn failing(self, times: u32) -> Self {
            self.transient_failures.store(times, Ordering::SeqCst);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CitationMatcher for FakeMatcher {
        async fn match_citation(
            &self,
            citation: &Citation,
            _citing: &Document,
        ) -> std::result::Result<MatchOutcome, MatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                return Err(MatchError::Permanent("syntax error".into()));
            }
            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(MatchError::Transient("response not ready".into()));
            }
            Ok(self
                .outcomes
                .get(&citation.canonical())
                .cloned()
                .unwrap_or(MatchOutcome::NoMatch))
        }
    }

    #[derive(Default)]
    struct State {
        documents: HashMap<DocumentId, Document>,
        targets: HashMap<DocumentId, Vec<CitedTarget>>,
        edges: HashMap<DocumentId, BTreeSet<DocumentId>>,
        counts: HashMap<i64, i32>,
        increments: Vec<(i64, bool)>,
        saves: Vec<(DocumentId, bool)>,
        failing_edge_writes: u32,
    }

    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<State>,
    }

    impl MemoryStore {
        fn add_document(&self, id: DocumentId, plain_text: &str) {
            self.state.lock().unwrap().documents.insert(
                id,
                Document {
                    id,
                    cluster_id: CITING_CLUSTER,
                    plain_text: Some(plain_text.to_string()),
                    ..Default::default()
                },
            );
        }

        fn add_html_document(&self, id: DocumentId, html: &str) {
            self.state.lock().unwrap().documents.insert(
                id,
                Document {
                    id,
                    cluster_id: CITING_CLUSTER,
                    html: Some(html.to_string()),
                    ..Default::default()
                },
            );
        }

        fn fail_edge_writes(&self, times: u32) {
            self.state.lock().unwrap().failing_edge_writes = times;
        }

        fn add_target(&self, id: DocumentId, cluster_id: i64) {
            let target = CitedTarget {
                id,
                cluster_id,
                url: format!("/opinion/{}/case-{}/", cluster_id, id),
            };
            let mut state = self.state.lock().unwrap();
            state.targets.entry(id).or_default().push(target);
            state.counts.entry(cluster_id).or_insert(0);
        }

        fn set_edges(&self, citing: DocumentId, cited: &[DocumentId]) {
            self.state
                .lock()
                .unwrap()
                .edges
                .insert(citing, cited.iter().copied().collect());
        }

        fn count(&self, cluster_id: i64) -> i32 {
            self.state.lock().unwrap().counts.get(&cluster_id).copied().unwrap_or(0)
        }

        fn edges(&self, citing: DocumentId) -> Vec<DocumentId> {
            self.state
                .lock()
                .unwrap()
                .edges
                .get(&citing)
                .map(|e| e.iter().copied().collect())
                .unwrap_or_default()
        }

        fn document(&self, id: DocumentId) -> Document {
            self.state.lock().unwrap().documents[&id].clone()
        }

        fn saves(&self) -> Vec<(DocumentId, bool)> {
            self.state.lock().unwrap().saves.clone()
        }

        fn increments(&self) -> Vec<(i64, bool)> {
            self.state.lock().unwrap().increments.clone()
        }

        fn document_store(self: &Arc<Self>) -> Arc<dyn DocumentStore> {
            self.clone()
        }

        fn aggregate_store(self: &Arc<Self>) -> Arc<dyn AggregateStore> {
            self.clone()
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn load_documents(&self, ids: &[DocumentId]) -> StoreResult<Vec<Document>> {
            let state = self.state.lock().unwrap();
            Ok(ids.iter().filter_map(|id| state.documents.get(id).cloned()).collect())
        }

        async fn lookup_target(&self, id: DocumentId) -> StoreResult<TargetLookup> {
            let records = self.state.lock().unwrap().targets.get(&id).cloned().unwrap_or_default();
            Ok(TargetLookup::from_records(records))
        }

        async fn cited_ids(&self, citing: DocumentId) -> StoreResult<BTreeSet<DocumentId>> {
            Ok(self.state.lock().unwrap().edges.get(&citing).cloned().unwrap_or_default())
        }

        async fn replace_cited(
            &self,
            citing: DocumentId,
            cited: &BTreeSet<DocumentId>,
        ) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            if state.failing_edge_writes > 0 {
                state.failing_edge_writes -= 1;
                return Err(AppError::DatabaseConnection {
                    message: "connection reset".into(),
                });
            }
            state.edges.insert(citing, cited.clone());
            Ok(())
        }

        async fn save_document(&self, document: &Document, index: bool) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            state.documents.insert(document.id, document.clone());
            state.saves.push((document.id, index));
            Ok(())
        }
    }

    #[async_trait]
    impl AggregateStore for MemoryStore {
        async fn increment_citation_count(
            &self,
            target: &CitedTarget,
            index: bool,
        ) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            *state.counts.entry(target.cluster_id).or_insert(0) += 1;
            state.increments.push((target.cluster_id, index));
            Ok(())
        }
    }

    fn linker(store: &Arc<MemoryStore>, matcher: Arc<FakeMatcher>) -> CitationLinker {
        CitationLinker::new(
            Arc::new(ReporterExtractor::new()),
            matcher,
            store.document_store(),
            store.aggregate_store(),
        )
        .with_retry(RetryPolicy::new(5, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_single_match_links_document() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "Held in 22 U.S. 44 that");
        store.add_target(7, 70);
        let matcher = Arc::new(FakeMatcher::default().with("22 U.S. 44", MatchOutcome::SingleMatch(7)));

        let report = tokio_test::assert_ok!(linker(&store, matcher).link_documents(&[CITING], true).await);

        assert!(report.is_success());
        let linked = &report.linked[0];
        assert_eq!(linked.citations_found, 1);
        assert_eq!(linked.citations_resolved, 1);
        assert_eq!(linked.newly_cited, 1);
        assert_eq!(linked.citations[0].match_id, Some(7));
        assert_eq!(linked.citations[0].match_url.as_deref(), Some("/opinion/70/case-7/"));

        assert_eq!(store.count(70), 1);
        assert_eq!(store.edges(CITING), vec![7]);
        let html = store.document(CITING).html_with_citations.unwrap();
        assert!(html.contains(r#"<span class="citation" data-id="7"><a href="/opinion/70/case-7/">"#));
        assert!(html.starts_with(r#"<pre class="inline">Held in </pre>"#));
        assert_eq!(store.saves(), vec![(CITING, true)]);
        assert_eq!(store.increments(), vec![(70, true)]);
    }

    #[tokio::test]
    async fn test_index_flag_reaches_every_write() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        store.add_target(7, 70);
        let matcher = Arc::new(FakeMatcher::default().with("22 U.S. 44", MatchOutcome::SingleMatch(7)));

        linker(&store, matcher).link_documents(&[CITING], false).await.unwrap();

        assert_eq!(store.increments(), vec![(70, false)]);
        assert_eq!(store.saves(), vec![(CITING, false)]);
    }

    #[tokio::test]
    async fn test_html_source_is_rewritten_in_place() {
        let store = Arc::new(MemoryStore::default());
        store.add_html_document(CITING, "<p>See <i>Smith</i>, 22 U.S. 44.</p>");
        store.add_target(7, 70);
        let matcher = Arc::new(FakeMatcher::default().with("22 U.S. 44", MatchOutcome::SingleMatch(7)));

        let report = linker(&store, matcher).link_documents(&[CITING], true).await.unwrap();

        assert_eq!(report.linked[0].citations_resolved, 1);
        let html = store.document(CITING).html_with_citations.unwrap();
        assert!(html.starts_with(r#"<p>See <i>Smith</i>, <span class="citation" data-id="7">"#));
        assert!(html.ends_with("</a></span>.</p>"));
        assert!(!html.contains("<pre"));
        assert_eq!(store.edges(CITING), vec![7]);
    }

    #[tokio::test]
    async fn test_failed_edge_write_is_not_counted_on_rerun() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        store.add_target(7, 70);
        store.fail_edge_writes(1);
        let matcher = Arc::new(FakeMatcher::default().with("22 U.S. 44", MatchOutcome::SingleMatch(7)));
        let linker = linker(&store, matcher);

        let first = linker.link_documents(&[CITING], true).await.unwrap();
        assert_eq!(first.failed.len(), 1);
        assert_eq!(store.count(70), 0);
        assert!(store.edges(CITING).is_empty());

        let second = linker.link_documents(&[CITING], true).await.unwrap();
        assert!(second.is_success());
        assert_eq!(second.linked[0].newly_cited, 1);
        assert_eq!(store.count(70), 1);
        assert_eq!(store.edges(CITING), vec![7]);

        linker.link_documents(&[CITING], true).await.unwrap();
        assert_eq!(store.count(70), 1);
    }

    #[tokio::test]
    async fn test_relinking_does_not_recount() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        store.add_target(7, 70);
        let matcher = Arc::new(FakeMatcher::default().with("22 U.S. 44", MatchOutcome::SingleMatch(7)));
        let linker = linker(&store, matcher);

        linker.link_documents(&[CITING], false).await.unwrap();
        let second = linker.link_documents(&[CITING], false).await.unwrap();

        assert_eq!(store.count(70), 1);
        assert_eq!(second.linked[0].newly_cited, 0);
        assert_eq!(store.edges(CITING), vec![7]);
    }

    #[tokio::test]
    async fn test_stale_edges_are_replaced() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "See 3 F.2d 4 and 13 Atl. 33");
        store.add_target(7, 70);
        store.add_target(8, 80);
        store.set_edges(CITING, &[7, 99]);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("3 F.2d 4", MatchOutcome::SingleMatch(7))
                .with("13 Atl. 33", MatchOutcome::SingleMatch(8)),
        );

        let report = linker(&store, matcher).link_documents(&[CITING], true).await.unwrap();

        assert_eq!(store.edges(CITING), vec![7, 8]);
        assert_eq!(report.linked[0].newly_cited, 1);
        assert_eq!(store.count(70), 0);
        assert_eq!(store.count(80), 1);
    }

    #[tokio::test]
    async fn test_distant_citations_link_independently() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44, 46 (13 Atl. 33)");
        store.add_target(7, 70);
        store.add_target(8, 80);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("22 U.S. 44", MatchOutcome::SingleMatch(7))
                .with("13 Atl. 33", MatchOutcome::SingleMatch(8)),
        );
        let extractor = FixedExtractor(vec![
            Citation::new(22, "U.S.", "44", 10),
            Citation::new(13, "Atl.", "33", 30),
        ]);
        let linker = CitationLinker::new(
            Arc::new(extractor),
            matcher,
            store.document_store(),
            store.aggregate_store(),
        )
        .with_retry(RetryPolicy::no_retry());

        let report = linker.link_documents(&[CITING], true).await.unwrap();

        let linked = &report.linked[0];
        assert_eq!(linked.parallel_groups, 0);
        assert_eq!(linked.citations_resolved, 2);
        assert_eq!(store.count(70), 1);
        assert_eq!(store.count(80), 1);
        assert_eq!(store.edges(CITING), vec![7, 8]);
    }

    #[tokio::test]
    async fn test_adjacent_citations_are_parallel() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44, (13 Atl. 33)");
        let matcher = Arc::new(FakeMatcher::default());

        let report = linker(&store, matcher).link_documents(&[CITING], true).await.unwrap();

        assert_eq!(report.linked[0].parallel_groups, 1);
        assert_eq!(report.linked[0].citations_resolved, 0);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        store.add_target(7, 70);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("22 U.S. 44", MatchOutcome::SingleMatch(7))
                .failing(2),
        );

        let report = linker(&store, matcher.clone())
            .link_documents(&[CITING], true)
            .await
            .unwrap();

        assert_eq!(matcher.calls(), 3);
        assert_eq!(report.linked[0].attempts, 3);
        assert_eq!(store.count(70), 1);
        assert_eq!(store.edges(CITING), vec![7]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_no_side_effects() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        store.add_target(7, 70);
        store.set_edges(CITING, &[99]);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("22 U.S. 44", MatchOutcome::SingleMatch(7))
                .failing(10),
        );

        let report = linker(&store, matcher.clone())
            .link_documents(&[CITING], true)
            .await
            .unwrap();

        assert_eq!(matcher.calls(), 5);
        let (id, err) = &report.failed[0];
        assert_eq!(*id, CITING);
        assert!(matches!(err, LinkError::RetriesExhausted { attempts: 5, .. }));
        assert_eq!(store.count(70), 0);
        assert_eq!(store.edges(CITING), vec![99]);
        assert!(store.saves().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44");
        let matcher = Arc::new(FakeMatcher {
            permanent: true,
            ..Default::default()
        });

        let report = linker(&store, matcher.clone())
            .link_documents(&[CITING], true)
            .await
            .unwrap();

        assert_eq!(matcher.calls(), 1);
        assert!(matches!(report.failed[0].1, LinkError::Match(MatchError::Permanent(_))));
    }

    #[tokio::test]
    async fn test_missing_and_ambiguous_targets_are_skipped() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "1 U.S. 2; 3 U.S. 4; 5 U.S. 6; 7 U.S. 8");
        store.add_target(40, 400);
        store.add_target(40, 401);
        store.add_target(60, 600);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("1 U.S. 2", MatchOutcome::SingleMatch(20))
                .with("3 U.S. 4", MatchOutcome::SingleMatch(40))
                .with("5 U.S. 6", MatchOutcome::SingleMatch(60))
                .with("7 U.S. 8", MatchOutcome::AmbiguousMatch(vec![60, 61])),
        );

        let report = linker(&store, matcher).link_documents(&[CITING], true).await.unwrap();

        let linked = &report.linked[0];
        assert_eq!(linked.citations_found, 4);
        assert_eq!(linked.citations_resolved, 1);
        assert_eq!(store.edges(CITING), vec![60]);
        assert_eq!(store.count(600), 1);

        let html = store.document(CITING).html_with_citations.unwrap();
        assert_eq!(html.matches("citation no-link").count(), 3);
    }

    #[tokio::test]
    async fn test_document_without_citations_is_saved_untouched() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "No citations here.");
        store.set_edges(CITING, &[5]);

        let report = linker(&store, Arc::new(FakeMatcher::default()))
            .link_documents(&[CITING], false)
            .await
            .unwrap();

        assert_eq!(report.linked[0].citations_found, 0);
        assert!(store.document(CITING).html_with_citations.is_none());
        assert_eq!(store.edges(CITING), vec![5]);
        assert_eq!(store.saves(), vec![(CITING, false)]);
    }

    #[tokio::test]
    async fn test_repeated_target_counted_once() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(CITING, "22 U.S. 44 and 5 L. Ed. 6");
        store.add_target(7, 70);
        let matcher = Arc::new(
            FakeMatcher::default()
                .with("22 U.S. 44", MatchOutcome::SingleMatch(7))
                .with("5 L. Ed. 6", MatchOutcome::SingleMatch(7)),
        );

        let report = linker(&store, matcher).link_documents(&[CITING], true).await.unwrap();

        assert_eq!(report.linked[0].citations_resolved, 2);
        assert_eq!(report.linked[0].newly_cited, 1);
        assert_eq!(store.count(70), 1);
        assert_eq!(store.edges(CITING), vec![7]);
    }

    #[tokio::test]
    async fn test_batch_reports_missing_and_failed() {
        let store = Arc::new(MemoryStore::default());
        store.add_document(1, "22 U.S. 44");
        store.add_document(2, "nothing");
        let matcher = Arc::new(FakeMatcher::default().failing(100));

        let report = linker(&store, matcher).link_documents(&[1, 2, 3], true).await.unwrap();

        assert_eq!(report.missing, vec![3]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 1);
        assert_eq!(report.linked.len(), 1);
        assert_eq!(report.linked[0].document_id, 2);
        assert!(!report.is_success());
    }
}
