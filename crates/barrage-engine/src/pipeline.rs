//! The scenario pipeline.
//!
//! Composes the whole run for one scenario: collect valid leaves, fuzz
//! them (or walk the static catalogue), inject at every position, probe
//! with every configured method, interleave valid-case heartbeats,
//! classify, and archive. Everything is single-threaded and
//! synchronous; derivatives are dispatched in a fixed order (catalogue
//! order or ascending round index, then template walk order, then the
//! configured method order), and findings are inserted in dispatch
//! order.

use std::collections::BTreeSet;

use barrage_core::{
    Codec, EngineError, HttpMethod, Node, RunnerHost, ScenarioConfig,
};
use barrage_fuzz::catalogue::catalogue;
use barrage_fuzz::{collect_values, derive, AnomalyMap, Mutator};
use barrage_http::codec;
use barrage_http::{check_valid_case, AuthProvider, Probe, ProbeRequest, ValidCase};
use barrage_storage::Archive;
use tracing::{debug, info, info_span, warn};

use crate::classify::Classifier;

/// Driver for one scenario. Owns its probe, classifier, archive, and
/// auth provider; parallel scenarios each get their own pipeline.
pub struct Pipeline {
    config: ScenarioConfig,
    probe: Probe,
    classifier: Classifier,
    archive: Archive,
    auth: Box<dyn AuthProvider>,
    methods: Vec<HttpMethod>,
    submission_method: HttpMethod,
    content_type: String,
    valid_cases: Option<BTreeSet<u16>>,
    valid_body: Vec<u8>,
    last_injection: Vec<u8>,
    new_findings: usize,
}

impl Pipeline {
    pub fn new(
        config: ScenarioConfig,
        archive: Archive,
        auth: Box<dyn AuthProvider>,
        host: RunnerHost,
    ) -> Result<Pipeline, EngineError> {
        config.validate()?;
        let probe = Probe::new(config.timeout_s, config.proxy_url.as_deref(), host)?;
        let classifier = Classifier::new(
            config.effective_allowed_statuses()?,
            config.effective_disallowed_statuses()?,
            &config.body_error_patterns,
        )?;
        let methods = config.effective_injection_methods()?;
        let submission_method = config.effective_method()?;
        let content_type = config.effective_content_type();
        let valid_cases = config.effective_valid_cases()?;
        Ok(Pipeline {
            config,
            probe,
            classifier,
            archive,
            auth,
            methods,
            submission_method,
            content_type,
            valid_cases,
            valid_body: Vec::new(),
            last_injection: Vec::new(),
            new_findings: 0,
        })
    }

    /// Build a pipeline with the archive opened from the scenario's
    /// `archive_url` and the runner host detected from the system.
    pub fn from_config(
        config: ScenarioConfig,
        auth: Box<dyn AuthProvider>,
    ) -> Result<Pipeline, EngineError> {
        let archive = Archive::open(config.archive_url.as_deref())?;
        Pipeline::new(config, archive, auth, RunnerHost::detect())
    }

    /// Findings stored by this pipeline so far.
    pub fn new_findings(&self) -> usize {
        self.new_findings
    }

    /// Static mode: walk the catalogue, injecting each entry at every
    /// position of the first valid submission.
    pub fn run_static(&mut self, submissions: &[Node]) -> Result<(), EngineError> {
        let span = info_span!("scenario", id = %self.config.scenario_id, mode = "static");
        let _guard = span.enter();

        let template = first_submission(submissions)?;
        self.prepare_valid_case(&template);
        self.initial_valid_case()?;

        for entry in catalogue() {
            let anomalies = AnomalyMap::from_catalogue_entry(entry);
            self.inject_round(&template, &anomalies)?;
        }
        info!(findings = self.new_findings, "static round complete");
        Ok(())
    }

    /// Fuzz mode: collect leaves from every valid submission, run the
    /// mutation tool, and inject one round per generated case.
    pub fn run_fuzz(&mut self, submissions: &[Node]) -> Result<(), EngineError> {
        let span = info_span!("scenario", id = %self.config.scenario_id, mode = "fuzz");
        let _guard = span.enter();

        let mutator_path =
            self.config
                .mutator_path
                .clone()
                .ok_or_else(|| EngineError::Config {
                    message: "fuzz mode requires mutator_path".to_string(),
                })?;
        let mutator = Mutator::new(mutator_path)?;

        let template = first_submission(submissions)?;
        self.prepare_valid_case(&template);
        self.initial_valid_case()?;

        let buckets = collect_values(submissions);
        let cases = self.config.cases_per_key;
        let sets = mutator.fuzz_values(&buckets, cases)?;

        for round in 0..cases {
            let anomalies = AnomalyMap::from_fuzz_round(&sets, round);
            self.inject_round(&template, &anomalies)?;
        }
        info!(findings = self.new_findings, "fuzz rounds complete");
        Ok(())
    }

    /// End-of-run gate: the scenario passes only if this run stored
    /// nothing and the archive holds no unresolved findings from
    /// earlier runs. Releases the archive handle on success.
    pub fn finish(self) -> Result<(), EngineError> {
        let unresolved = self.archive.new_count()?;
        if self.new_findings > 0 || unresolved > 0 {
            return Err(EngineError::NewFindings {
                new_this_run: self.new_findings,
                unresolved_in_archive: unresolved,
            });
        }
        self.archive.close()?;
        Ok(())
    }

    /// One anomaly map: every derivative, every configured method,
    /// heartbeat interleaved when instrumentation is on.
    fn inject_round(&mut self, template: &Node, anomalies: &AnomalyMap) -> Result<(), EngineError> {
        for derivative in derive(template, anomalies) {
            let encoded = codec::encode(self.config.codec, &derivative);
            for method in self.methods.clone() {
                let body = self.wire_body(method, &encoded);
                let credentials = self.auth.credentials(false)?;
                let mut observation = self.probe.send(&ProbeRequest {
                    scenario_id: &self.config.scenario_id,
                    url: &self.config.target_url,
                    method,
                    content_type: &self.content_type,
                    body: &body,
                    auth: &credentials,
                    valid_case: false,
                })?;
                self.last_injection = body;

                if self.classifier.classify(&mut observation) {
                    if self.archive.add_if_absent(&observation)? {
                        self.new_findings += 1;
                        warn!(
                            status = %observation.resp_statuscode,
                            protocol_error = %observation.server_protocol_error,
                            timeout = observation.server_timeout,
                            "new finding archived"
                        );
                    }
                } else {
                    debug!(status = %observation.resp_statuscode, "benign");
                }

                if self.config.valid_case_instrumentation {
                    self.heartbeat()?;
                }
            }
        }
        Ok(())
    }

    /// The valid case is encoded once per run; heartbeats re-send the
    /// same bytes.
    fn prepare_valid_case(&mut self, template: &Node) {
        let encoded = codec::encode(self.config.codec, template);
        self.valid_body = self.wire_body(self.submission_method, &encoded);
    }

    fn initial_valid_case(&mut self) -> Result<(), EngineError> {
        debug!("checking the valid case before injecting");
        self.heartbeat()
    }

    fn heartbeat(&mut self) -> Result<(), EngineError> {
        check_valid_case(
            &self.probe,
            &ValidCase {
                scenario_id: &self.config.scenario_id,
                url: &self.config.target_url,
                method: self.submission_method,
                content_type: &self.content_type,
                body: &self.valid_body,
                acceptable: self.valid_cases.as_ref(),
            },
            self.auth.as_mut(),
            &self.last_injection,
        )
    }

    /// GET carries a form submission as a query string; the probe
    /// appends the body to the URL verbatim, so the `?` is supplied
    /// here. URL path parameters start with `;` by construction and
    /// JSON rides without a prefix.
    fn wire_body(&self, method: HttpMethod, encoded: &[u8]) -> Vec<u8> {
        if method == HttpMethod::Get && self.config.codec == Codec::Form {
            let mut body = Vec::with_capacity(encoded.len() + 1);
            body.push(b'?');
            body.extend_from_slice(encoded);
            body
        } else {
            encoded.to_vec()
        }
    }
}

fn first_submission(submissions: &[Node]) -> Result<Node, EngineError> {
    submissions
        .first()
        .cloned()
        .ok_or_else(|| EngineError::Config {
            message: "scenario has no valid submissions".to_string(),
        })
}
