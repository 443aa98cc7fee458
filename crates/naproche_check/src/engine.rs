//! The obligation dispatch engine.
//!
//! Walks the statement stream, maintaining:
//!
//! - the global axiom list (seeded with the structural set axioms and
//!   persistent across the run);
//! - the theorem-level context (cleared when a new theorem starts);
//! - per-proof scope: an ordered proof context with a scope stack for
//!   `Case ... End` splits.
//!
//! For each non-assumption proof step the engine submits one obligation
//! to a worker pool sized to the host's parallelism. Submissions capture
//! immutable by-value snapshots of all three layers; every formula
//! shipped as an axiom is closed at submission time. Obligations finish
//! out of order but are reported in submission order.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_recursion::async_recursion;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use naproche_language::{
    extract_forthel_blocks, parse_block, Block, BlockKind, Directive, Statement, Translator,
};
use naproche_logic::{Formula, QuantifierKind, Term};

use crate::cache::{context_digest, formula_digest, CacheError, ProofCache, CACHE_FILE};
use crate::prover::{Prover, ProverManager};
use crate::report::{BenchmarkInfo, ProverTiming, Reporter, StepSource};

/// Fatal engine setup error. Per-sentence and per-include problems are
/// reported and skipped instead.
#[derive(Debug)]
pub enum CheckError {
    Cache(CacheError),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Cache(e) => write!(f, "{}", e),
        }
    }
}

impl Error for CheckError {}

impl From<CacheError> for CheckError {
    fn from(e: CacheError) -> Self {
        CheckError::Cache(e)
    }
}

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base directory for `read` include resolution.
    pub base_path: PathBuf,
    /// Run every registered prover on each obligation and report timings.
    pub benchmark: bool,
    /// Master cache switch; when false the `cache on` directive is inert.
    pub use_cache: bool,
    /// Location of the persistent cache file.
    pub cache_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_path: PathBuf::from("."),
            benchmark: false,
            use_cache: true,
            cache_path: PathBuf::from(CACHE_FILE),
        }
    }
}

/// Result of one dispatched obligation.
#[derive(Debug, Clone)]
struct VerifyOutcome {
    success: bool,
    source: StepSource,
    benchmark: Option<BenchmarkInfo>,
}

/// Snapshot shipped to a worker together with the goal.
struct ObligationConfig {
    provers: Vec<Arc<dyn Prover>>,
    benchmark: bool,
    timeout: Duration,
    cache: Option<Arc<ProofCache>>,
}

struct PendingObligation {
    handle: JoinHandle<VerifyOutcome>,
    step: usize,
    description: String,
}

/// The dispatch engine.
pub struct Engine {
    translator: Translator,
    axioms: Vec<(String, Formula)>,
    context: Vec<(String, Formula)>,
    current_goal: Option<Formula>,
    counter: usize,
    base_path: PathBuf,
    processed_files: HashSet<String>,
    reporter: Arc<dyn Reporter>,
    provers: ProverManager,
    benchmark: bool,
    global_use_cache: bool,
    cache_enabled: bool,
    cache: Option<Arc<ProofCache>>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl Engine {
    pub fn new(config: EngineConfig, reporter: Arc<dyn Reporter>) -> Result<Engine, CheckError> {
        let cache = if config.use_cache {
            Some(Arc::new(ProofCache::open(&config.cache_path)?))
        } else {
            None
        };
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let mut engine = Engine {
            translator: Translator::new(),
            axioms: Vec::new(),
            context: Vec::new(),
            current_goal: None,
            counter: 0,
            base_path: config.base_path,
            processed_files: HashSet::new(),
            reporter,
            provers: ProverManager::new(),
            benchmark: config.benchmark,
            global_use_cache: config.use_cache,
            cache_enabled: config.use_cache,
            cache,
            timeout: Duration::from_secs(5),
            permits: Arc::new(Semaphore::new(workers)),
        };
        for (name, formula) in builtin_axioms() {
            engine.axioms.push((name, formula));
        }
        Ok(engine)
    }

    /// The global axiom list, including the built-in set axioms.
    pub fn axioms(&self) -> &[(String, Formula)] {
        &self.axioms
    }

    pub fn provers_mut(&mut self) -> &mut ProverManager {
        &mut self.provers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Process a statement stream to completion, checking every proof.
    pub async fn check(&mut self, statements: &[Statement]) {
        self.check_statements(statements, false).await;
    }

    #[async_recursion]
    async fn check_statements(&mut self, statements: &[Statement], included: bool) {
        for stmt in statements {
            self.process_statement(stmt, included).await;
        }
    }

    #[async_recursion]
    async fn process_statement(&mut self, stmt: &Statement, included: bool) {
        match stmt {
            Statement::Directive(d) => self.handle_directive(d).await,
            Statement::Sentence(_) => {
                for formula in self.translator.translate_statement(stmt) {
                    self.add_axiom(formula);
                }
            }
            Statement::Block(block) => match block.kind {
                BlockKind::Axiom | BlockKind::Definition | BlockKind::Lemma => {
                    for formula in self.translator.translate_block(block) {
                        self.add_axiom(formula);
                    }
                }
                BlockKind::Theorem => {
                    if included {
                        self.import_theorem(block);
                    } else {
                        self.start_theorem(block);
                    }
                }
                BlockKind::Proof => {
                    if !included {
                        self.reporter.log("Checking Proof...");
                        self.check_proof(block).await;
                    }
                }
                BlockKind::Other => {
                    log::debug!("ignoring block of unknown kind");
                }
            },
        }
    }

    fn add_axiom(&mut self, formula: Formula) {
        let name = format!("ax_{}", self.counter);
        self.counter += 1;
        self.reporter.log(&format!("Added axiom: {}", formula));
        self.axioms.push((name, formula));
    }

    /// An included theorem is trusted and imported as an axiom.
    fn import_theorem(&mut self, block: &Block) {
        let label = block.label.as_deref().unwrap_or("unnamed");
        self.reporter.log(&format!("Importing Theorem: {}", label));
        if let Some(formula) = self.translator.translate_block(block).pop() {
            let name = format!("thm_{}", self.counter);
            self.counter += 1;
            self.reporter
                .log(&format!("Added axiom (Theorem): {}", formula));
            self.axioms.push((name, formula));
        }
    }

    /// Set up the theorem-level context and working goal.
    fn start_theorem(&mut self, block: &Block) {
        let label = block.label.as_deref().unwrap_or("unnamed");
        self.reporter.log(&format!("Checking Theorem: {}", label));
        self.context.clear();
        self.current_goal = None;

        let translation = self.translator.translate_theorem(block);
        for formula in translation.context {
            let name = format!("ctx_{}", self.counter);
            self.counter += 1;
            self.reporter.log(&format!("Added context: {}", formula));
            self.context.push((name, formula));
        }
        match translation.goal {
            Some(goal) => {
                self.reporter.log(&format!("Goal: {}", goal));
                self.current_goal = Some(goal);
            }
            None => self.reporter.error("Could not translate theorem statement."),
        }
    }

    async fn handle_directive(&mut self, directive: &Directive) {
        match directive.name.as_str() {
            "read" => {
                if let Some(path) = directive.args.first() {
                    self.process_file(path).await;
                }
            }
            "prover" => {
                let Some(name) = directive.args.first() else {
                    return;
                };
                if self.benchmark {
                    self.reporter.log(&format!(
                        "Benchmark mode active. Ignoring [prover {}] directive.",
                        name
                    ));
                } else if self.provers.set_active(name) {
                    self.reporter.log(&format!("Switching prover to: {}", name));
                } else {
                    self.reporter.error(&format!("Unknown prover: {}", name));
                }
            }
            "cache" => match directive.args.first().map(String::as_str) {
                Some("on") => self.cache_enabled = self.global_use_cache,
                Some("off") => self.cache_enabled = false,
                _ => self.reporter.log("Warning: cache directive expects on/off"),
            },
            "timelimit" => {
                match directive.args.first().and_then(|a| a.parse::<u64>().ok()) {
                    Some(secs) => self.timeout = Duration::from_secs(secs),
                    None => self
                        .reporter
                        .log("Warning: timelimit directive expects seconds"),
                }
            }
            "synonym" => {
                for arg in &directive.args {
                    let mut parts = arg.split('/');
                    if let Some(base) = parts.next() {
                        for variant in parts {
                            self.translator.add_synonym(base, variant);
                        }
                    }
                }
            }
            other => {
                self.reporter
                    .log(&format!("Warning: unknown directive [{}]", other));
            }
        }
    }

    /// Resolve and load an included source, sharing macros, synonyms, and
    /// the axiom list. Proofs in included files are skipped; theorems are
    /// imported as axioms. Already-loaded paths are ignored.
    #[async_recursion]
    async fn process_file(&mut self, path: &str) {
        if !self.processed_files.insert(path.to_string()) {
            return;
        }
        let mut full_path = self.base_path.join(path);
        if !full_path.exists() {
            let fallback = self.base_path.join("math").join(path);
            if fallback.exists() {
                full_path = fallback;
            } else {
                self.reporter
                    .log(&format!("Warning: Included file not found: {}", path));
                return;
            }
        }
        self.reporter
            .log(&format!("Processing included file: {}", full_path.display()));
        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => content,
            Err(e) => {
                self.reporter.log(&format!(
                    "Error processing included file {}: {}",
                    full_path.display(),
                    e
                ));
                return;
            }
        };
        for block_text in extract_forthel_blocks(&content) {
            match parse_block(&block_text) {
                Ok(statements) => self.check_statements(&statements, true).await,
                Err(e) => {
                    self.reporter.log(&format!(
                        "Error parsing block of {}: {}",
                        full_path.display(),
                        e
                    ));
                }
            }
        }
    }

    /// Check one proof block against the current working goal.
    async fn check_proof(&mut self, proof: &Block) {
        let initial_context = self.decompose_goal();
        self.check_proof_inner(proof, initial_context).await;
    }

    /// Strip the working goal's outer universal quantifiers (replacing
    /// each bound variable by a fresh constant named after it, which is
    /// exactly the name proof steps use for the same object) and outer
    /// implications (keeping the antecedents as local assumptions).
    /// Returns the starting proof context; the decomposed focus replaces
    /// `current_goal` for the duration of the proof.
    fn decompose_goal(&mut self) -> Vec<(String, Formula)> {
        let mut context = Vec::new();
        let Some(goal) = self.current_goal.clone() else {
            return context;
        };
        let mut focus = goal.closure();
        loop {
            match focus {
                Formula::Quantified {
                    kind: QuantifierKind::Universal,
                    vars,
                    body,
                } => {
                    let mut stripped = *body;
                    for var in vars {
                        let constant = Term::constant(var.to_lowercase());
                        stripped = stripped.substitute(&var, &constant);
                    }
                    focus = stripped;
                }
                Formula::Implies(antecedent, consequent) => {
                    let name = format!("asm_{}", self.counter);
                    self.counter += 1;
                    self.reporter
                        .log(&format!("Assumed from goal: {}", antecedent));
                    context.push((name, *antecedent));
                    focus = *consequent;
                }
                other => {
                    focus = other;
                    break;
                }
            }
        }
        self.current_goal = Some(focus);
        context
    }

    #[async_recursion]
    async fn check_proof_inner(
        &mut self,
        proof: &Block,
        initial_context: Vec<(String, Formula)>,
    ) {
        let mut proof_context = initial_context;
        let mut scope_stack: Vec<Vec<(String, Formula)>> = Vec::new();
        let mut pending: Vec<PendingObligation> = Vec::new();

        for (i, stmt) in proof.content.iter().enumerate() {
            let step = i + 1;
            match stmt {
                Statement::Directive(d) => self.handle_directive(d).await,
                Statement::Block(nested) => {
                    if nested.kind == BlockKind::Proof {
                        self.reporter.log("Checking nested proof...");
                        self.check_proof_inner(nested, proof_context.clone()).await;
                    } else {
                        for formula in self.translator.translate_block(nested) {
                            self.add_axiom(formula);
                        }
                    }
                }
                Statement::Sentence(s) => {
                    let text = s.text.trim();
                    let outcome = match self.translator.translate_sentence(s, false) {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            self.reporter.error(&format!(
                                "Step {}: Could not translate '{}'",
                                step, text
                            ));
                            continue;
                        }
                    };
                    let formula = match outcome {
                        naproche_language::SentenceOutcome::Formula(f) => f,
                        naproche_language::SentenceOutcome::Structural => {
                            if text.starts_with("End") {
                                match scope_stack.pop() {
                                    Some(saved) => {
                                        proof_context = saved;
                                        self.reporter.log(&format!("Step {}: End of case.", step));
                                    }
                                    None => self
                                        .reporter
                                        .log(&format!("Step {}: End without open case.", step)),
                                }
                            }
                            continue;
                        }
                    };

                    if formula.is_sentinel("contrary") {
                        match &self.current_goal {
                            Some(goal) => {
                                let negated = Formula::not(goal.clone());
                                self.reporter
                                    .log(&format!("Step {}: Assumed contrary: {}", step, negated));
                                proof_context.push((format!("step_{}", i), negated));
                            }
                            None => self
                                .reporter
                                .error(&format!("Step {}: no goal to contradict", step)),
                        }
                        continue;
                    }

                    if formula.is_sentinel("false") {
                        self.reporter.log(&format!("Step {}: Contradiction.", step));
                        let handle = self.submit(Formula::pred("false", vec![]), &proof_context);
                        pending.push(PendingObligation {
                            handle,
                            step,
                            description: "Contradiction".to_string(),
                        });
                        continue;
                    }

                    if text.starts_with("Case") {
                        self.reporter
                            .log(&format!("Step {}: Case assumption: {}", step, formula));
                        scope_stack.push(proof_context.clone());
                        proof_context.push((format!("step_{}", i), formula));
                        continue;
                    }

                    let is_assumption = ["Assume", "Let", "Take", "Define", "Consider"]
                        .iter()
                        .any(|prefix| text.starts_with(prefix));
                    if is_assumption {
                        self.reporter
                            .log(&format!("Step {}: Assumption/Definition: {}", step, formula));
                        proof_context.push((format!("step_{}", i), formula));
                        continue;
                    }

                    self.reporter
                        .log(&format!("Step {}: Verifying {}", step, formula));
                    let description = format!("Verification of {}", formula);
                    let handle = self.submit(formula.clone(), &proof_context);
                    pending.push(PendingObligation {
                        handle,
                        step,
                        description,
                    });
                    proof_context.push((format!("step_{}", i), formula));
                }
            }
        }

        self.reporter.log("Waiting for verification tasks...");
        for pending_obligation in pending {
            let PendingObligation {
                handle,
                step,
                description,
            } = pending_obligation;
            match handle.await {
                Ok(outcome) => self.reporter.step_verified(
                    step,
                    &description,
                    outcome.success,
                    outcome.source,
                    outcome.benchmark.as_ref(),
                ),
                Err(e) => self
                    .reporter
                    .error(&format!("Step {}: Task failed with error: {}", step, e)),
            }
        }
    }

    /// Snapshot the axiom list, theorem context, and proof context by
    /// value, closing every formula, and hand the obligation to a worker.
    fn submit(
        &self,
        goal: Formula,
        proof_context: &[(String, Formula)],
    ) -> JoinHandle<VerifyOutcome> {
        let axioms: Vec<(String, Formula)> = self
            .axioms
            .iter()
            .chain(self.context.iter())
            .chain(proof_context.iter())
            .map(|(name, f)| (name.clone(), f.closure()))
            .collect();
        let config = ObligationConfig {
            provers: if self.benchmark {
                self.provers.all()
            } else {
                vec![self.provers.active()]
            },
            benchmark: self.benchmark,
            timeout: self.timeout,
            cache: if self.cache_enabled {
                self.cache.clone()
            } else {
                None
            },
        };
        let permits = self.permits.clone();
        tokio::spawn(verify_obligation(axioms, goal, config, permits))
    }
}

/// Worker body: cache lookup, prover run(s), cache store.
async fn verify_obligation(
    axioms: Vec<(String, Formula)>,
    goal: Formula,
    config: ObligationConfig,
    permits: Arc<Semaphore>,
) -> VerifyOutcome {
    let _permit = permits.acquire_owned().await.ok();

    let goal_hash = formula_digest(&goal);
    let digest_by_name: HashMap<String, String> = axioms
        .iter()
        .map(|(name, f)| (name.clone(), formula_digest(f)))
        .collect();
    let digests: Vec<String> = digest_by_name.values().cloned().collect();
    let available: HashSet<String> = digests.iter().cloned().collect();
    let context_hash = context_digest(&digests, &goal_hash);

    if !config.benchmark {
        if let Some(cache) = &config.cache {
            match cache.lookup(&goal_hash, &available, &context_hash) {
                Ok(Some(result)) => {
                    return VerifyOutcome {
                        success: result,
                        source: StepSource::Cached,
                        benchmark: None,
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("cache lookup failed: {}", e),
            }
        }
    }

    if config.benchmark {
        let runs = config.provers.iter().map(|prover| {
            let prover = prover.clone();
            let axioms = &axioms;
            let goal = &goal;
            let timeout = config.timeout;
            async move {
                let outcome = prover.prove(axioms, ("goal", goal), timeout).await;
                (prover.name().to_string(), outcome)
            }
        });
        let results = futures::future::join_all(runs).await;
        let mut info = BenchmarkInfo::new();
        let mut success = false;
        for (name, outcome) in results {
            success = success || outcome.success;
            info.insert(
                name,
                ProverTiming {
                    success: outcome.success,
                    time: outcome.time_taken,
                },
            );
        }
        return VerifyOutcome {
            success,
            source: StepSource::Prover,
            benchmark: Some(info),
        };
    }

    let Some(prover) = config.provers.first() else {
        return VerifyOutcome {
            success: false,
            source: StepSource::Prover,
            benchmark: None,
        };
    };
    let outcome = prover.prove(&axioms, ("goal", &goal), config.timeout).await;

    if let Some(cache) = &config.cache {
        let dependencies: Vec<String> = if outcome.success {
            match &outcome.used_axioms {
                Some(names) => names
                    .iter()
                    .filter_map(|n| digest_by_name.get(n))
                    .cloned()
                    .collect(),
                None => digests.clone(),
            }
        } else {
            Vec::new()
        };
        if let Err(e) = cache.store(&goal_hash, &dependencies, outcome.success, &context_hash) {
            log::warn!("cache store failed: {}", e);
        }
    }

    VerifyOutcome {
        success: outcome.success,
        source: StepSource::Prover,
        benchmark: None,
    }
}

/// Structural axioms for the function symbols the translator emits
/// freely: set difference, intersection, union, the empty set, singleton
/// and pair sets, and pair-equality projection.
fn builtin_axioms() -> Vec<(String, Formula)> {
    fn v(name: &str) -> Term {
        Term::var(name)
    }
    fn in_pred(l: Term, r: Term) -> Formula {
        Formula::pred("in", vec![l, r])
    }

    let setminus = Formula::forall(
        vec!["X".into(), "A".into(), "B".into()],
        Formula::iff(
            in_pred(v("X"), Term::func("setminus", vec![v("A"), v("B")])),
            Formula::and(
                in_pred(v("X"), v("A")),
                Formula::not(in_pred(v("X"), v("B"))),
            ),
        ),
    );
    let cap = Formula::forall(
        vec!["X".into(), "A".into(), "B".into()],
        Formula::iff(
            in_pred(v("X"), Term::func("cap", vec![v("A"), v("B")])),
            Formula::and(in_pred(v("X"), v("A")), in_pred(v("X"), v("B"))),
        ),
    );
    let cup = Formula::forall(
        vec!["X".into(), "A".into(), "B".into()],
        Formula::iff(
            in_pred(v("X"), Term::func("cup", vec![v("A"), v("B")])),
            Formula::or(in_pred(v("X"), v("A")), in_pred(v("X"), v("B"))),
        ),
    );
    let empty = Formula::forall(
        vec!["X".into()],
        Formula::not(in_pred(v("X"), Term::constant("empty_set"))),
    );
    let singleton = Formula::forall(
        vec!["X".into(), "A".into()],
        Formula::iff(
            in_pred(v("X"), Term::func("singleton", vec![v("A")])),
            Formula::equal(v("X"), v("A")),
        ),
    );
    let pair_set = Formula::forall(
        vec!["X".into(), "A".into(), "B".into()],
        Formula::iff(
            in_pred(v("X"), Term::func("set_enum", vec![v("A"), v("B")])),
            Formula::or(
                Formula::equal(v("X"), v("A")),
                Formula::equal(v("X"), v("B")),
            ),
        ),
    );
    let pair_eq = Formula::forall(
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        Formula::implies(
            Formula::equal(
                Term::func("pair", vec![v("A"), v("B")]),
                Term::func("pair", vec![v("C"), v("D")]),
            ),
            Formula::and(
                Formula::equal(v("A"), v("C")),
                Formula::equal(v("B"), v("D")),
            ),
        ),
    );

    vec![
        ("builtin_setminus".to_string(), setminus),
        ("builtin_cap".to_string(), cap),
        ("builtin_cup".to_string(), cup),
        ("builtin_empty_set".to_string(), empty),
        ("builtin_singleton".to_string(), singleton),
        ("builtin_pair_set".to_string(), pair_set),
        ("builtin_pair_eq".to_string(), pair_eq),
    ]
}
