//! Planner session state, updated only through [`PlannerState::apply`].
//!
//! Actions that need the network return an [`Effect`]; the caller runs it
//! (see [`run_effect`]) and feeds the resulting completion action back in.
//! Completions carry the ticket of the request that produced them, so a
//! response for a term or search that has since been replaced is ignored.

use crate::api::{CourseApiClient, FetchError, ListEnvelope, SectionSearchParams};
use crate::calendar::WeekGrid;
use crate::enumerate::{enumerate, EnumerateOptions, Outcome};
use crate::fetcher::{self, TermCatalog};
use crate::model::{CourseKey, Section};
use crate::search::{LatestSlot, SearchStatus, Sequencer, Ticket};
use crate::selector::Selection;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from state transitions that the user can correct.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("No term is loaded yet")]
    NoCatalog,

    #[error("Course {0} is not offered this term")]
    UnknownCourse(CourseKey),

    #[error("Invalid course key: {0}")]
    InvalidCourseKey(String),
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Switches term. Clears the selection and starts loading the catalog.
    SetTerm { year: i32, term: u32 },
    TermLoaded {
        ticket: Ticket,
        result: Result<TermCatalog, FetchError>,
    },
    AddCourse(CourseKey),
    RemoveCourse(CourseKey),
    ClearSelection,
    SetEnumerateOptions(EnumerateOptions),
    /// New search parameters, already debounced by the caller.
    SetSearch(SectionSearchParams),
    SearchCompleted {
        ticket: Ticket,
        result: Result<ListEnvelope<Section>, FetchError>,
    },
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    LoadTerm { year: i32, term: u32, ticket: Ticket },
    Search { params: SectionSearchParams, ticket: Ticket },
}

/// One combination, reduced to what a view needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationSummary {
    pub section_ids: Vec<String>,
    pub valid: bool,
    pub conflicts: Vec<(usize, usize)>,
}

/// Enumeration results for one selection generation.
#[derive(Debug, Clone, Serialize)]
pub struct CombinationSet {
    #[serde(skip)]
    generation: u64,
    pub outcome: Outcome,
    pub empty_courses: Vec<CourseKey>,
    pub total: u64,
    pub examined: u64,
    pub truncated: bool,
    pub combinations: Vec<CombinationSummary>,
}

/// How the term catalog stands.
#[derive(Debug, Clone)]
pub enum CatalogState {
    Unloaded,
    Loading { year: i32, term: u32 },
    Loaded(TermCatalog),
    /// The whole view is replaced by this error; there is no partial data.
    Failed { year: i32, term: u32, error: FetchError },
}

pub struct PlannerState {
    catalog: CatalogState,
    term_loads: Sequencer,
    selection: Selection,
    options: EnumerateOptions,
    combinations: Option<CombinationSet>,
    search_params: SectionSearchParams,
    search: LatestSlot<ListEnvelope<Section>>,
}

impl PlannerState {
    pub fn new(options: EnumerateOptions) -> Self {
        Self {
            catalog: CatalogState::Unloaded,
            term_loads: Sequencer::new(),
            selection: Selection::new(),
            options,
            combinations: None,
            search_params: SectionSearchParams::default(),
            search: LatestSlot::new(),
        }
    }

    pub fn apply(&mut self, action: Action) -> Result<Effect, SelectionError> {
        match action {
            Action::SetTerm { year, term } => {
                let ticket = self.term_loads.issue();
                info!(year, term, ticket = ticket.value(), "Switching term");
                self.catalog = CatalogState::Loading { year, term };
                self.selection.clear();
                self.combinations = None;
                Ok(Effect::LoadTerm { year, term, ticket })
            }
            Action::TermLoaded { ticket, result } => {
                if !self.term_loads.is_current(ticket) {
                    debug!(ticket = ticket.value(), "Ignoring catalog for a superseded term");
                    return Ok(Effect::None);
                }
                let (year, term) = match &self.catalog {
                    CatalogState::Loading { year, term } => (*year, *term),
                    _ => return Ok(Effect::None),
                };
                self.catalog = match result {
                    Ok(catalog) => CatalogState::Loaded(catalog),
                    Err(error) => {
                        warn!(year, term, error = %error, "Term failed to load");
                        CatalogState::Failed { year, term, error }
                    }
                };
                Ok(Effect::None)
            }
            Action::AddCourse(key) => {
                let CatalogState::Loaded(catalog) = &self.catalog else {
                    return Err(SelectionError::NoCatalog);
                };
                let course = catalog
                    .course(&key)
                    .cloned()
                    .ok_or(SelectionError::UnknownCourse(key))?;
                self.selection.add(course);
                Ok(Effect::None)
            }
            Action::RemoveCourse(key) => {
                if self.selection.remove(&key).is_some() {
                    self.combinations = None;
                }
                Ok(Effect::None)
            }
            Action::ClearSelection => {
                self.selection.clear();
                self.combinations = None;
                Ok(Effect::None)
            }
            Action::SetEnumerateOptions(options) => {
                self.options = options;
                self.combinations = None;
                Ok(Effect::None)
            }
            Action::SetSearch(params) => {
                self.search_params = params.clone();
                let ticket = self.search.begin();
                Ok(Effect::Search { params, ticket })
            }
            Action::SearchCompleted { ticket, result } => {
                self.search.complete(ticket, result);
                Ok(Effect::None)
            }
        }
    }

    /// Parses `raw` (e.g. `"CPSC 1150"`) and adds that course.
    pub fn add_course_by_name(&mut self, raw: &str) -> Result<Effect, SelectionError> {
        let key = raw
            .parse::<CourseKey>()
            .map_err(SelectionError::InvalidCourseKey)?;
        self.apply(Action::AddCourse(key))
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn search_params(&self) -> &SectionSearchParams {
        &self.search_params
    }

    pub fn search_status(&self) -> &SearchStatus<ListEnvelope<Section>> {
        self.search.status()
    }

    /// Combinations for the current selection, recomputed only when the
    /// selection or options changed since the last call.
    pub fn combinations(&mut self) -> &CombinationSet {
        let generation = self.selection.generation();
        let stale = self
            .combinations
            .as_ref()
            .map_or(true, |set| set.generation != generation);
        if stale {
            self.combinations = Some(build_set(&self.selection, self.options));
        }
        self.combinations
            .get_or_insert_with(|| build_set(&self.selection, self.options))
    }

    /// Calendar for the `index`th combination of the current selection.
    pub fn calendar(&mut self, index: usize) -> Option<WeekGrid> {
        let ids = self.combinations().combinations.get(index)?.section_ids.clone();
        let sections: Vec<&Section> = ids
            .iter()
            .filter_map(|id| {
                self.selection
                    .list()
                    .iter()
                    .find_map(|course| course.section(id))
            })
            .collect();
        Some(WeekGrid::from_sections(sections))
    }
}

fn build_set(selection: &Selection, options: EnumerateOptions) -> CombinationSet {
    let enumerated = enumerate(selection.list()).collect_with(options);
    debug!(
        generation = selection.generation(),
        total = enumerated.total,
        kept = enumerated.combinations.len(),
        "Recomputed combinations"
    );
    CombinationSet {
        generation: selection.generation(),
        outcome: enumerated.outcome,
        empty_courses: enumerated.empty_courses.clone(),
        total: enumerated.total,
        examined: enumerated.examined,
        truncated: enumerated.truncated,
        combinations: enumerated
            .combinations
            .iter()
            .map(|c| CombinationSummary {
                section_ids: c.section_ids(),
                valid: c.valid,
                conflicts: c.conflicts.clone(),
            })
            .collect(),
    }
}

/// Performs an effect against the API and returns the completion to apply.
pub async fn run_effect(client: &CourseApiClient, effect: Effect) -> Option<Action> {
    match effect {
        Effect::None => None,
        Effect::LoadTerm { year, term, ticket } => {
            let result = fetcher::fetch_term(client, year, term).await;
            Some(Action::TermLoaded { ticket, result })
        }
        Effect::Search { params, ticket } => {
            let result = client.search_sections(&params).await.map(|f| f.data);
            Some(Action::SearchCompleted { ticket, result })
        }
    }
}
