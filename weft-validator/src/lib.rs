use fnv::FnvHashSet;
use std::fmt;
use std::rc::Rc;
use weft_model::blueprint::{Blueprint, Report, Severity};
use weft_model::checks::{self, BlueprintError};
use weft_model::predicate::Predicate;
use weft_syntax::{Event, EventKind, Path, TagId};

/// Stable codes carried by engine-emitted validations.
pub mod codes {
    pub const UNEXPECTED_EVENT: &str = "unexpected-event";
    pub const UNTERMINATED_STRUCTURE: &str = "unterminated-structure";
    pub const BLUEPRINT_SATISFIED: &str = "blueprint-satisfied";
}

/// Index of a state in the compiled graph's arena.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Debug)]
pub struct StateId(pub u32);

/// The depth component of a guard. Transitions are pinned to the static
/// element depth their combinator was compiled at; this is what keeps an
/// unconstrained content region disjoint from the exit of its enclosing
/// element.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Level {
    /// Exactly this many elements open.
    At(u32),
    /// Strictly more than this many elements open.
    Beyond(u32),
}

impl Level {
    fn admits(self, depth: usize) -> bool {
        match self {
            Level::At(at) => depth == at as usize,
            Level::Beyond(base) => depth > base as usize,
        }
    }
}

fn levels_overlap(a: Level, b: Level) -> bool {
    match (a, b) {
        (Level::At(x), Level::At(y)) => x == y,
        (Level::At(x), Level::Beyond(y)) | (Level::Beyond(y), Level::At(x)) => x > y,
        (Level::Beyond(_), Level::Beyond(_)) => true,
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum EventGuard {
    Open(Predicate<TagId>),
    Close(Predicate<TagId>),
    Word(Predicate<String>),
    Space,
    /// Any event at all; only used together with [`Level::Beyond`] for
    /// unconstrained content regions.
    Any,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Guard {
    pub on: EventGuard,
    pub level: Level,
}

impl Guard {
    pub fn admits(&self, event: &Event, depth: usize) -> bool {
        if !self.level.admits(depth) {
            return false;
        }
        match (&self.on, event.kind()) {
            (EventGuard::Any, _) => true,
            (EventGuard::Open(p), EventKind::Open(tag)) => p.validate(tag),
            (EventGuard::Close(p), EventKind::Close(tag)) => p.validate(tag),
            (EventGuard::Word(p), EventKind::Word(text)) => p.validate(text),
            (EventGuard::Space, EventKind::Space(_)) => true,
            _ => false,
        }
    }

    /// Conservative: `true` whenever both guards could admit one event.
    pub fn overlaps(&self, other: &Guard) -> bool {
        if !levels_overlap(self.level, other.level) {
            return false;
        }
        match (&self.on, &other.on) {
            (EventGuard::Any, _) | (_, EventGuard::Any) => true,
            (EventGuard::Open(p), EventGuard::Open(q))
            | (EventGuard::Close(p), EventGuard::Close(q)) => p.overlaps(q),
            (EventGuard::Word(p), EventGuard::Word(q)) => p.overlaps(q),
            (EventGuard::Space, EventGuard::Space) => true,
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match &self.on {
            EventGuard::Open(p) => format!("element-start matching {}", p),
            EventGuard::Close(p) => format!("element-end matching {}", p),
            EventGuard::Word(p) => format!("word matching {}", p),
            EventGuard::Space => "whitespace".to_string(),
            EventGuard::Any => "any event".to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Transition {
    pub guard: Guard,
    pub target: StateId,
}

#[derive(Default, Debug)]
pub struct QueryState {
    transitions: Vec<Transition>,
    accept: bool,
    action: Option<Report>,
    skip: Option<StateId>,
}

/// How the engine tracks its position in the graph.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ValidationStateType {
    /// A set of simultaneously-live positions, explored NFA-style; any one
    /// reaching acceptance is a match. Tolerates ambiguous blueprints.
    Many,
    /// A single live position with a backtrack stack. Requires the compiled
    /// graph to be unambiguous.
    Stack,
}

impl ValidationStateType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStateType::Many => "many",
            ValidationStateType::Stack => "stack",
        }
    }
}

impl fmt::Display for ValidationStateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum CompileError {
    Blueprint(BlueprintError),
    /// Two transitions from one state could fire on the same event; only
    /// tolerable under [`ValidationStateType::Many`].
    Ambiguous {
        state: StateId,
        first: String,
        second: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Blueprint(err) => write!(f, "{}", err),
            CompileError::Ambiguous {
                state,
                first,
                second,
            } => write!(
                f,
                "ambiguous under stack discipline: state {} admits both {} and {}",
                state.0, first, second
            ),
        }
    }
}

impl From<BlueprintError> for CompileError {
    fn from(err: BlueprintError) -> CompileError {
        CompileError::Blueprint(err)
    }
}

/// The compiled automaton: a frozen arena of states reachable from
/// [`QueryGraph::ENTRY`]. Immutable and shared read-only once built.
#[derive(Debug)]
pub struct QueryGraph {
    states: Vec<QueryState>,
    discipline: ValidationStateType,
}

impl QueryGraph {
    pub const ENTRY: StateId = StateId(0);

    pub fn compile(
        blueprint: &Blueprint,
        discipline: ValidationStateType,
    ) -> Result<QueryGraph, CompileError> {
        QueryGraphBuilder::compile(blueprint, discipline)
    }

    pub fn discipline(&self) -> ValidationStateType {
        self.discipline
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_accepting(&self, id: StateId) -> bool {
        self.state(id).accept
    }

    /// Declare a default transition taken when nothing else fires at
    /// `state`, under stack discipline. Not reachable from the blueprint
    /// syntax; for embedders assembling lenient graphs.
    pub fn set_skip(&mut self, state: StateId, target: StateId) {
        self.states[state.0 as usize].skip = Some(target);
    }

    fn state(&self, id: StateId) -> &QueryState {
        &self.states[id.0 as usize]
    }
}

/// Construction handle for [`QueryGraph`]s: recursive descent over the
/// blueprint, carrying an input frontier in and an output frontier out of
/// every combinator. Consumed by compilation; the graph it yields is
/// independent of it.
pub struct QueryGraphBuilder {
    states: Vec<QueryState>,
    discipline: ValidationStateType,
}

impl QueryGraphBuilder {
    pub fn compile(
        blueprint: &Blueprint,
        discipline: ValidationStateType,
    ) -> Result<QueryGraph, CompileError> {
        checks::check_blueprint(blueprint)?;
        let mut builder = QueryGraphBuilder {
            states: vec![QueryState::default()],
            discipline,
        };
        let outputs = builder.node(blueprint, &[QueryGraph::ENTRY], 0);
        for state in outputs {
            builder.states[state.0 as usize].accept = true;
        }
        if builder.discipline == ValidationStateType::Stack {
            builder.ensure_deterministic()?;
        }
        Ok(QueryGraph {
            states: builder.states,
            discipline,
        })
    }

    fn fresh(&mut self) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(QueryState::default());
        id
    }

    fn connect(&mut self, from: StateId, guard: Guard, target: StateId) {
        let transitions = &mut self.states[from.0 as usize].transitions;
        if !transitions
            .iter()
            .any(|t| t.target == target && t.guard == guard)
        {
            transitions.push(Transition { guard, target });
        }
    }

    /// One fresh state, entered from every input through `guard`.
    fn literal(&mut self, inputs: &[StateId], guard: Guard) -> StateId {
        let state = self.fresh();
        for &input in inputs {
            self.connect(input, guard.clone(), state);
        }
        state
    }

    /// The loop state for element content that is not constrained: words and
    /// whitespace at the content level, anything at all below it. The
    /// enclosing element's close transition stays disjoint by level.
    fn free_region(&mut self, entered: StateId, level: u32) -> StateId {
        let state = self.fresh();
        let guards = [
            Guard {
                on: EventGuard::Word(Predicate::Anything),
                level: Level::At(level),
            },
            Guard {
                on: EventGuard::Space,
                level: Level::At(level),
            },
            Guard {
                on: EventGuard::Any,
                level: Level::Beyond(level),
            },
        ];
        for from in [entered, state] {
            for guard in &guards {
                self.connect(from, guard.clone(), state);
            }
        }
        state
    }

    fn node(&mut self, blueprint: &Blueprint, inputs: &[StateId], level: u32) -> Vec<StateId> {
        match blueprint {
            Blueprint::Empty => inputs.to_vec(),

            Blueprint::Space => vec![self.literal(
                inputs,
                Guard {
                    on: EventGuard::Space,
                    level: Level::At(level),
                },
            )],

            Blueprint::Word(text) => vec![self.literal(
                inputs,
                Guard {
                    on: EventGuard::Word(text.clone()),
                    level: Level::At(level),
                },
            )],

            Blueprint::Element(tag, content) => {
                let entered = self.literal(
                    inputs,
                    Guard {
                        on: EventGuard::Open(tag.clone()),
                        level: Level::At(level + 1),
                    },
                );
                let outputs = match content {
                    Some(inner) => self.node(inner, &[entered], level + 1),
                    None => {
                        let region = self.free_region(entered, level + 1);
                        vec![entered, region]
                    }
                };
                vec![self.literal(
                    &outputs,
                    Guard {
                        on: EventGuard::Close(tag.clone()),
                        level: Level::At(level + 1),
                    },
                )]
            }

            Blueprint::Sequence(parts) => {
                let mut frontier = inputs.to_vec();
                for part in parts {
                    frontier = self.node(part, &frontier, level);
                }
                frontier
            }

            Blueprint::Choice(branches) => {
                let mut outputs = Vec::new();
                for branch in branches {
                    for state in self.node(branch, inputs, level) {
                        if !outputs.contains(&state) {
                            outputs.push(state);
                        }
                    }
                }
                outputs
            }

            Blueprint::Repeat(body) => {
                // Compile the body once, then replay the transitions it hung
                // off the input frontier onto every body output: that is the
                // cycle. Inputs stay outputs for the zero-iteration case.
                let marks: Vec<usize> = inputs
                    .iter()
                    .map(|&i| self.states[i.0 as usize].transitions.len())
                    .collect();
                let body_outputs = self.node(body, inputs, level);
                let mut entries: Vec<Transition> = Vec::new();
                for (&input, &mark) in inputs.iter().zip(&marks) {
                    for t in &self.states[input.0 as usize].transitions[mark..] {
                        if !entries.contains(t) {
                            entries.push(t.clone());
                        }
                    }
                }
                for &output in &body_outputs {
                    if !inputs.contains(&output) {
                        for t in &entries {
                            self.connect(output, t.guard.clone(), t.target);
                        }
                    }
                }
                let mut outputs = inputs.to_vec();
                for state in body_outputs {
                    if !outputs.contains(&state) {
                        outputs.push(state);
                    }
                }
                outputs
            }

            Blueprint::Flagged(report, body) => {
                let outputs = self.node(body, inputs, level);
                for &state in &outputs {
                    self.states[state.0 as usize].action = Some(report.clone());
                }
                outputs
            }
        }
    }

    fn ensure_deterministic(&self) -> Result<(), CompileError> {
        for (index, state) in self.states.iter().enumerate() {
            for (i, a) in state.transitions.iter().enumerate() {
                for b in &state.transitions[i + 1..] {
                    if a.target != b.target && a.guard.overlaps(&b.guard) {
                        return Err(CompileError::Ambiguous {
                            state: StateId(index as u32),
                            first: a.guard.describe(),
                            second: b.guard.describe(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// An emitted diagnostic: severity, stable code, message, and the chain of
/// open elements at the offence. Immutable once created.
#[derive(Clone, Debug)]
pub struct Validation {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub path: Path,
    pub span: Option<codemap::Span>,
}

impl Validation {
    pub fn diagnostic(&self) -> codemap_diagnostic::Diagnostic {
        let level = match self.severity {
            Severity::Error => codemap_diagnostic::Level::Error,
            Severity::Warning => codemap_diagnostic::Level::Warning,
            Severity::Information => codemap_diagnostic::Level::Note,
            Severity::Verbose => codemap_diagnostic::Level::Help,
        };
        let spans = match self.span {
            Some(span) => vec![codemap_diagnostic::SpanLabel {
                span,
                label: Some(format!("at {}", self.path)),
                style: codemap_diagnostic::SpanStyle::Primary,
            }],
            None => vec![],
        };
        codemap_diagnostic::Diagnostic {
            level,
            message: self.message.clone(),
            code: Some(self.code.clone()),
            spans,
        }
    }
}

#[derive(Clone, Debug)]
enum Positions {
    Many { live: FnvHashSet<StateId> },
    Stack { current: StateId, saved: Vec<StateId> },
}

#[derive(Clone, Debug)]
struct AcceptMark {
    depth: usize,
    positions: Positions,
}

/// Executes a compiled graph against a live event stream.
///
/// Recovery discipline: when no transition fires, one `unexpected-event`
/// error is emitted and events are discarded until the element depth returns
/// to that of the most recent accepting snapshot, which is then restored.
/// One malformed region therefore produces one error.
pub struct Validator {
    graph: Rc<QueryGraph>,
    positions: Positions,
    path: Path,
    verbose: bool,
    recovering: Option<usize>,
    mark: Option<AcceptMark>,
    out: Vec<Validation>,
}

impl Validator {
    pub fn new(graph: Rc<QueryGraph>) -> Validator {
        let positions = Self::initial(&graph);
        let mut validator = Validator {
            graph,
            positions,
            path: Path::new(),
            verbose: false,
            recovering: None,
            mark: None,
            out: Vec::new(),
        };
        validator.note_accept();
        validator
    }

    pub fn with_verbose(mut self, verbose: bool) -> Validator {
        self.verbose = verbose;
        self
    }

    fn initial(graph: &QueryGraph) -> Positions {
        match graph.discipline() {
            ValidationStateType::Many => {
                let mut live = FnvHashSet::default();
                live.insert(QueryGraph::ENTRY);
                Positions::Many { live }
            }
            ValidationStateType::Stack => Positions::Stack {
                current: QueryGraph::ENTRY,
                saved: Vec::new(),
            },
        }
    }

    pub fn on_event(&mut self, event: Rc<Event>) {
        if let EventKind::Open(_) = event.kind() {
            self.path.push_open(event.clone());
        }
        let depth = self.path.depth();

        if let Some(target) = self.recovering {
            // Discard the rest of the malformed region; the close that
            // brings us back to the marked depth ends it.
            if let EventKind::Close(tag) = *event.kind() {
                self.path.pop_close(tag);
                if self.path.depth() <= target {
                    self.recovering = None;
                    self.restore();
                }
            }
            return;
        }

        let alive = self.step(&event, depth);
        if !alive {
            self.report_unexpected(&event);
        }
        if let EventKind::Close(tag) = *event.kind() {
            self.path.pop_close(tag);
        }
        if alive {
            self.note_accept();
        } else {
            let target = self.mark.as_ref().map(|m| m.depth).unwrap_or(0);
            if self.path.depth() > target {
                self.recovering = Some(target);
            } else {
                self.restore();
            }
        }
    }

    /// Signal end of the event stream.
    pub fn finish(&mut self) {
        if self.recovering.take().is_some() {
            self.restore();
        }
        if !self.accepting() {
            let expected = self.expected();
            let message = if expected.is_empty() {
                "input ended before the structure was complete".to_string()
            } else {
                format!(
                    "input ended before the structure was complete; expected {}",
                    expected
                )
            };
            let span = self.path.last().map(|e| e.span());
            self.out.push(Validation {
                severity: Severity::Error,
                code: codes::UNTERMINATED_STRUCTURE.to_string(),
                message,
                path: self.path.clone(),
                span,
            });
        } else if self.verbose {
            self.out.push(Validation {
                severity: Severity::Verbose,
                code: codes::BLUEPRINT_SATISFIED.to_string(),
                message: "structure satisfied the blueprint".to_string(),
                path: self.path.clone(),
                span: None,
            });
        }
    }

    pub fn take_validations(&mut self) -> Vec<Validation> {
        std::mem::take(&mut self.out)
    }

    fn step(&mut self, event: &Event, depth: usize) -> bool {
        let graph = self.graph.clone();
        let mut entered: Vec<StateId> = Vec::new();
        let alive = match &mut self.positions {
            Positions::Many { live } => {
                let mut next = FnvHashSet::default();
                for &state in live.iter() {
                    for t in &graph.state(state).transitions {
                        if t.guard.admits(event, depth) {
                            next.insert(t.target);
                        }
                    }
                }
                if next.is_empty() {
                    false
                } else {
                    for &state in &next {
                        if !live.contains(&state) && graph.state(state).action.is_some() {
                            entered.push(state);
                        }
                    }
                    *live = next;
                    true
                }
            }
            Positions::Stack { current, saved } => {
                let state = graph.state(*current);
                match state
                    .transitions
                    .iter()
                    .find(|t| t.guard.admits(event, depth))
                {
                    Some(t) => {
                        if t.target != *current && graph.state(t.target).action.is_some() {
                            entered.push(t.target);
                        }
                        *current = t.target;
                        true
                    }
                    None => match state.skip {
                        Some(skip) => {
                            saved.push(*current);
                            *current = skip;
                            true
                        }
                        None => false,
                    },
                }
            }
        };
        entered.sort();
        for state in entered {
            if let Some(report) = &graph.state(state).action {
                self.out.push(Validation {
                    severity: report.severity,
                    code: report.code.clone(),
                    message: report.message.clone(),
                    path: self.path.clone(),
                    span: Some(event.span()),
                });
            }
        }
        alive
    }

    fn accepting(&self) -> bool {
        match &self.positions {
            Positions::Many { live } => live.iter().any(|&s| self.graph.state(s).accept),
            Positions::Stack { current, .. } => self.graph.state(*current).accept,
        }
    }

    fn note_accept(&mut self) {
        if self.accepting() {
            self.mark = Some(AcceptMark {
                depth: self.path.depth(),
                positions: self.positions.clone(),
            });
        }
    }

    fn restore(&mut self) {
        self.positions = match &self.mark {
            Some(mark) => mark.positions.clone(),
            None => Self::initial(&self.graph),
        };
    }

    fn report_unexpected(&mut self, event: &Event) {
        let expected = self.expected();
        let message = if expected.is_empty() {
            format!("{} not expected here", event.describe())
        } else {
            format!(
                "{} not expected here; expected {}",
                event.describe(),
                expected
            )
        };
        self.out.push(Validation {
            severity: Severity::Error,
            code: codes::UNEXPECTED_EVENT.to_string(),
            message,
            path: self.path.clone(),
            span: Some(event.span()),
        });
    }

    /// Human-readable rendering of the transitions the live positions were
    /// waiting for, for mismatch messages.
    fn expected(&self) -> String {
        // TODO: group entries by event kind so wide choices read better
        const MAX_SHOWN: usize = 4;
        let states: Vec<StateId> = match &self.positions {
            Positions::Many { live } => {
                let mut states: Vec<StateId> = live.iter().copied().collect();
                states.sort();
                states
            }
            Positions::Stack { current, .. } => vec![*current],
        };
        let mut seen: Vec<String> = Vec::new();
        for state in states {
            for t in &self.graph.state(state).transitions {
                let desc = t.guard.describe();
                if !seen.contains(&desc) {
                    seen.push(desc);
                }
            }
        }
        let rest = seen.len().saturating_sub(MAX_SHOWN);
        let mut result = String::new();
        for (i, desc) in seen.iter().take(MAX_SHOWN).enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(desc);
        }
        if rest > 0 {
            result.push_str(&format!(" .. or one of {} more", rest));
        }
        result
    }
}

/// Lifecycle of one document-processing session.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ContextState {
    /// No events processed yet; the engine is not attached.
    Created,
    /// Normal event dispatch.
    Running,
    /// A nested sub-document owns the stream; this context is suspended.
    Importing,
    /// Terminal. Further events are a protocol error.
    Completed,
}

impl ContextState {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextState::Created => "created",
            ContextState::Running => "running",
            ContextState::Importing => "importing",
            ContextState::Completed => "completed",
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One context per document-processing session. Owns the engine, gates the
/// lifecycle, and holds the validations produced so far.
///
/// Nested imports form a logical stack: the outer context keeps its path and
/// live positions untouched while a freshly created inner context consumes
/// the stream; this is recursion, not concurrency.
///
/// Lifecycle misuse is a producer bug, not document content, and panics
/// instead of producing a [`Validation`].
pub struct Context {
    graph: Rc<QueryGraph>,
    state: ContextState,
    engine: Option<Validator>,
    inner: Option<Box<Context>>,
    verbose: bool,
    validations: Vec<Validation>,
}

impl Context {
    pub fn new(graph: Rc<QueryGraph>) -> Context {
        Context {
            graph,
            state: ContextState::Created,
            engine: None,
            inner: None,
            verbose: false,
            validations: Vec::new(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Context {
        self.verbose = verbose;
        self
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn on_event(&mut self, event: Event) {
        match self.state {
            ContextState::Completed => {
                panic!("protocol violation: event dispatched to a completed context")
            }
            ContextState::Importing => {
                self.inner_mut().on_event(event);
                self.drain_inner();
            }
            ContextState::Created => {
                self.state = ContextState::Running;
                self.engine =
                    Some(Validator::new(self.graph.clone()).with_verbose(self.verbose));
                self.dispatch(event);
            }
            ContextState::Running => self.dispatch(event),
        }
    }

    /// Suspend this document and begin a nested one, validated against
    /// `graph`. Permitted only while running (or forwarded to the innermost
    /// import when already importing).
    pub fn begin_import(&mut self, graph: Rc<QueryGraph>) {
        match self.state {
            ContextState::Running => {
                self.inner = Some(Box::new(Context::new(graph).with_verbose(self.verbose)));
                self.state = ContextState::Importing;
            }
            ContextState::Importing => self.inner_mut().begin_import(graph),
            ContextState::Created | ContextState::Completed => panic!(
                "protocol violation: import begun while context is {}",
                self.state
            ),
        }
    }

    /// Complete the innermost import and resume the suspended document.
    pub fn finish_import(&mut self) {
        match self.state {
            ContextState::Importing => {
                if self.inner_mut().state() == ContextState::Importing {
                    self.inner_mut().finish_import();
                    self.drain_inner();
                    return;
                }
                let mut inner = self.inner.take().unwrap_or_else(|| {
                    panic!("importing context lost its inner document")
                });
                // an import that streamed no events completes vacuously
                if inner.state() != ContextState::Created {
                    inner.complete();
                }
                self.validations.append(&mut inner.validations);
                self.state = ContextState::Running;
            }
            _ => panic!(
                "protocol violation: import finished while context is {}",
                self.state
            ),
        }
    }

    /// End of stream. Runs the engine's completion pass; the context becomes
    /// terminal.
    pub fn complete(&mut self) {
        match self.state {
            ContextState::Running => {
                if let Some(engine) = &mut self.engine {
                    engine.finish();
                }
                self.drain_engine();
                self.engine = None;
                self.state = ContextState::Completed;
            }
            ContextState::Created | ContextState::Importing | ContextState::Completed => panic!(
                "protocol violation: completion requested while context is {}",
                self.state
            ),
        }
    }

    /// Early termination signalled by the producer: become terminal at once,
    /// discarding live positions and emitting nothing further. A completed
    /// context aborts as a no-op.
    pub fn abort(&mut self) {
        self.inner = None;
        self.engine = None;
        self.state = ContextState::Completed;
    }

    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    pub fn take_validations(&mut self) -> Vec<Validation> {
        std::mem::take(&mut self.validations)
    }

    fn dispatch(&mut self, event: Event) {
        if let Some(engine) = &mut self.engine {
            engine.on_event(Rc::new(event));
        }
        self.drain_engine();
    }

    fn drain_engine(&mut self) {
        if let Some(engine) = &mut self.engine {
            self.validations.append(&mut engine.take_validations());
        }
    }

    fn drain_inner(&mut self) {
        if let Some(inner) = &mut self.inner {
            self.validations.append(&mut inner.validations);
        }
    }

    fn inner_mut(&mut self) -> &mut Context {
        match &mut self.inner {
            Some(inner) => inner,
            None => panic!("importing context lost its inner document"),
        }
    }
}
