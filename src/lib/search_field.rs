use super::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};
use std::time::Instant;

/// What the owning screen learns from a call to [`SearchField::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// The latest lookup finished and replaced the proposals.
    Proposals(usize),
    /// The latest lookup failed. The proposal list is now empty.
    Failed(SearchError),
}

/// Where a search field currently is in its input/lookup cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldState {
    /// Nothing scheduled and no answer outstanding.
    Idle,
    /// Waiting for the input to stay unchanged for the quiet interval.
    Debouncing,
    /// A lookup was sent and its answer is still wanted.
    Querying,
}

/// Handed to the selection handler when the user picks a proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The label as it was displayed, possibly truncated.
    pub formatted_address: String,
    pub full_address: String,
    pub coordinates: Coordinates,
}

struct Lookup {
    sequence: u64,
    query: String,
    result: Result<Vec<AddressCandidate>, SearchError>,
}

/// One debounced address search box.
///
/// The field owns the input text, the proposal list and at most one pending
/// debounce timer. It is driven from a single event loop: feed keystrokes into
/// `on_input_change` and call `update` once per tick. Lookups run on loader
/// threads and report back over a channel. Every lookup is numbered and only
/// the answer to the most recent one is ever applied.
pub struct SearchField {
    config: SearchConfig,
    geocoder: Arc<dyn Geocoder>,
    on_select: Box<dyn FnMut(&Selection)>,
    input: String,
    debouncer: Debouncer<String>,
    proposals: Vec<AddressCandidate>,
    loaders: Vec<(u64, JoinHandle<()>)>,
    channel: (Sender<Lookup>, Receiver<Lookup>),
    sequence: u64,
    awaiting: Option<u64>,
}

impl SearchField {
    pub fn new(
        config: SearchConfig,
        geocoder: Arc<dyn Geocoder>,
        on_select: impl FnMut(&Selection) + 'static,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(config.quiet_interval()),
            config,
            geocoder,
            on_select: Box::new(on_select),
            input: String::new(),
            proposals: vec![],
            loaders: vec![],
            channel: unbounded(),
            sequence: 0,
            awaiting: None,
        }
    }

    /// Creates a field that queries `config.endpoint` over HTTP.
    pub fn with_client(config: SearchConfig, on_select: impl FnMut(&Selection) + 'static) -> Self {
        let geocoder = Arc::new(GeocodeClient::new(&config));
        Self::new(config, geocoder, on_select)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn proposals(&self) -> &[AddressCandidate] {
        &self.proposals
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The proposals as they should be displayed, in response order.
    pub fn display_labels(&self) -> Vec<String> {
        self.proposals
            .iter()
            .map(|c| format_candidate(c, self.config.max_display_length))
            .collect()
    }

    pub fn state(&self) -> FieldState {
        if self.debouncer.is_pending() {
            FieldState::Debouncing
        } else if self.awaiting.is_some() {
            FieldState::Querying
        } else {
            FieldState::Idle
        }
    }

    /// Records a change of the input text.
    ///
    /// Blank text clears the proposals right away and sends nothing. Anything else
    /// restarts the debounce timer. A lookup that is already under way is not
    /// affected; its answer is still applied unless a newer lookup is sent first.
    pub fn on_input_change(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();
        self.debouncer.cancel();

        if self.input.trim().is_empty() {
            self.proposals.clear();
            self.awaiting = None;
            return;
        }

        self.debouncer.schedule(self.input.trim().to_string(), now);
    }

    /// Advances the field to `now`.
    ///
    /// Sends the lookup whose quiet interval has elapsed and applies finished
    /// lookups. Returns what changed for the most recent lookup, if anything.
    pub fn update(&mut self, now: Instant) -> Option<SearchEvent> {
        if let Some(query) = self.debouncer.poll(now) {
            self.dispatch(query);
        }
        self.finalize_lookups()
    }

    /// Hands the proposal at `index` to the selection handler, then empties the
    /// input and the proposal list.
    pub fn select(&mut self, index: usize) -> Result<(), SearchError> {
        let candidate = self
            .proposals
            .get(index)
            .ok_or(SearchError::UnknownCandidate(index))?;

        let selection = Selection {
            formatted_address: format_candidate(candidate, self.config.max_display_length),
            full_address: full_address(candidate),
            coordinates: candidate.coordinates,
        };
        (self.on_select)(&selection);

        self.reset();
        Ok(())
    }

    /// Cancels the pending timer and disowns outstanding lookups.
    /// Nothing is sent or applied afterwards until the input changes again.
    pub fn teardown(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.input.clear();
        self.proposals.clear();
        self.debouncer.cancel();
        self.awaiting = None;
    }

    fn dispatch(&mut self, query: String) {
        self.sequence += 1;
        let sequence = self.sequence;
        self.awaiting = Some(sequence);
        log::debug!("Looking up {:?} (#{}).", query, sequence);

        let geocoder = self.geocoder.clone();
        let tx = self.channel.0.clone();
        self.loaders.push((
            sequence,
            spawn(move || {
                let result = geocoder.search(&query);
                if tx
                    .send(Lookup {
                        sequence,
                        query,
                        result,
                    })
                    .is_err()
                {
                    log::debug!("Could not send the lookup result. The search field is gone.");
                }
            }),
        ));
    }

    fn finalize_lookups(&mut self) -> Option<SearchEvent> {
        // Loaders that are done have already sent whatever they are going to send.
        let finished: Vec<u64> = self
            .loaders
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(sequence, _)| *sequence)
            .collect();

        let mut event = None;
        let lookups: Vec<Lookup> = self.channel.1.try_iter().collect();
        for lookup in lookups {
            self.join_loader(lookup.sequence);
            if let Some(e) = self.apply(lookup) {
                event = Some(e);
            }
        }

        // Whatever finished without reporting back has panicked.
        for sequence in finished {
            if self.join_loader(sequence) && self.awaiting == Some(sequence) {
                self.awaiting = None;
                self.proposals.clear();
                event = Some(SearchEvent::Failed(SearchError::Network(
                    "the lookup was aborted".to_string(),
                )));
            }
        }

        event
    }

    fn apply(&mut self, lookup: Lookup) -> Option<SearchEvent> {
        if self.awaiting != Some(lookup.sequence) {
            log::debug!(
                "Discarding stale result for {:?} (#{}).",
                lookup.query,
                lookup.sequence
            );
            return None;
        }
        self.awaiting = None;

        match lookup.result {
            Ok(candidates) => {
                self.proposals = candidates;
                Some(SearchEvent::Proposals(self.proposals.len()))
            }
            Err(e) => {
                self.proposals.clear();
                Some(SearchEvent::Failed(e))
            }
        }
    }

    /// Joins the loader for `sequence`. Returns whether it was still tracked.
    fn join_loader(&mut self, sequence: u64) -> bool {
        let position = self.loaders.iter().position(|(s, _)| *s == sequence);
        match position {
            Some(i) => {
                let (_, handle) = self.loaders.remove(i);
                if let Err(e) = handle.join() {
                    log::error!("Failed to join lookup thread #{}. Reason:\r\n{:?}", sequence, e);
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for SearchField {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Answers every query with one candidate whose street is the query itself.
/// Queries starting with `slow` wait until `release` is called, `nowhere` fails.
#[cfg(test)]
struct RecordingGeocoder {
    calls: std::sync::Mutex<Vec<String>>,
    gate: (crossbeam_channel::Sender<()>, crossbeam_channel::Receiver<()>),
}

#[cfg(test)]
impl RecordingGeocoder {
    fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            gate: unbounded(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Lets one waiting `slow` lookup finish.
    fn release(&self) {
        self.gate.0.send(()).unwrap();
    }
}

#[cfg(test)]
impl Geocoder for RecordingGeocoder {
    fn search(&self, query: &str) -> Result<Vec<AddressCandidate>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());
        if query.starts_with("slow") {
            self.gate
                .1
                .recv_timeout(std::time::Duration::from_secs(10))
                .unwrap();
        }
        if query == "nowhere" {
            return Err(SearchError::Network("connection reset".to_string()));
        }
        Ok(vec![AddressCandidate::new(
            Some("12".to_string()),
            query,
            "Paris",
            "75002",
            Coordinates::new(2.331_09, 48.869_11),
        )])
    }
}

#[cfg(test)]
struct PanickingGeocoder;

#[cfg(test)]
impl Geocoder for PanickingGeocoder {
    fn search(&self, _query: &str) -> Result<Vec<AddressCandidate>, SearchError> {
        panic!("geocoder blew up")
    }
}

#[cfg(test)]
type Selections = std::rc::Rc<std::cell::RefCell<Vec<Selection>>>;

#[cfg(test)]
fn test_field() -> (SearchField, Arc<RecordingGeocoder>, Selections) {
    let geocoder = Arc::new(RecordingGeocoder::new());
    let selections = Selections::default();
    let sink = selections.clone();
    let field = SearchField::new(SearchConfig::default(), geocoder.clone(), move |s| {
        sink.borrow_mut().push(s.clone())
    });
    (field, geocoder, selections)
}

/// Keeps updating until the field stops waiting for an answer.
#[cfg(test)]
fn settle(field: &mut SearchField, now: Instant) -> Option<SearchEvent> {
    let give_up = Instant::now() + std::time::Duration::from_secs(5);
    let mut event = None;
    loop {
        if let Some(e) = field.update(now) {
            event = Some(e);
        }
        if field.state() != FieldState::Querying || Instant::now() > give_up {
            return event;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Keeps updating until every loader thread has reported back.
#[cfg(test)]
fn drain(field: &mut SearchField, now: Instant) -> Option<SearchEvent> {
    let give_up = Instant::now() + std::time::Duration::from_secs(5);
    let mut event = None;
    loop {
        if let Some(e) = field.update(now) {
            event = Some(e);
        }
        if field.loaders.is_empty() || Instant::now() > give_up {
            return event;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

#[cfg(test)]
fn ms(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[test]
fn blank_input_sends_nothing() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    for text in &["", " ", "\t  \n"] {
        field.on_input_change(*text, start);
        assert_eq!(field.state(), FieldState::Idle);
    }
    assert_eq!(settle(&mut field, start + ms(5_000)), None);
    assert!(field.proposals().is_empty());
    assert!(geocoder.calls().is_empty());
}

#[test]
fn fast_typing_sends_one_lookup_for_the_final_text() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("Par", start);
    field.on_input_change("Pari", start + ms(150));
    field.update(start + ms(300));
    field.on_input_change("Paris", start + ms(450));
    assert_eq!(field.state(), FieldState::Debouncing);

    field.update(start + ms(900));
    assert_eq!(settle(&mut field, start + ms(950)), Some(SearchEvent::Proposals(1)));

    assert_eq!(geocoder.calls(), vec!["Paris".to_string()]);
    assert_eq!(field.proposals()[0].street, "Paris");
    assert_eq!(field.state(), FieldState::Idle);
}

#[test]
fn clearing_the_input_clears_the_proposals() {
    let (mut field, _, _) = test_field();
    let start = Instant::now();

    field.on_input_change("Rue de la Paix", start);
    settle(&mut field, start + ms(500));
    assert_eq!(field.proposals().len(), 1);

    field.on_input_change("  ", start + ms(600));
    assert!(field.proposals().is_empty());
    assert_eq!(field.state(), FieldState::Idle);
}

#[test]
fn selecting_resets_the_field_and_reports_coordinates() {
    let (mut field, _, selections) = test_field();
    let start = Instant::now();

    field.on_input_change("Rue de la Paix", start);
    settle(&mut field, start + ms(500));
    assert_eq!(
        field.display_labels(),
        vec!["12 Rue de la Paix - Paris - 75002".to_string()]
    );

    field.select(0).unwrap();

    assert_eq!(field.input(), "");
    assert!(field.proposals().is_empty());
    let selections = selections.borrow();
    assert_eq!(selections.len(), 1);
    assert_eq!(
        selections[0].formatted_address,
        "12 Rue de la Paix - Paris - 75002"
    );
    assert_eq!(selections[0].coordinates.longitude, 2.331_09);
    assert_eq!(selections[0].coordinates.latitude, 48.869_11);
}

#[test]
fn selecting_an_unknown_index_changes_nothing() {
    let (mut field, _, selections) = test_field();
    let start = Instant::now();

    field.on_input_change("Paris", start);
    settle(&mut field, start + ms(500));

    assert_eq!(field.select(3), Err(SearchError::UnknownCandidate(3)));
    assert_eq!(field.input(), "Paris");
    assert_eq!(field.proposals().len(), 1);
    assert!(selections.borrow().is_empty());
}

#[test]
fn failed_lookup_does_not_lock_up_the_field() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("Paris", start);
    settle(&mut field, start + ms(500));
    field.on_input_change("nowhere", start + ms(600));
    let event = settle(&mut field, start + ms(1_100));

    assert!(matches!(event, Some(SearchEvent::Failed(SearchError::Network(_)))));
    assert!(field.proposals().is_empty());
    assert_eq!(field.state(), FieldState::Idle);

    field.on_input_change("Lyon", start + ms(1_200));
    assert_eq!(settle(&mut field, start + ms(1_700)), Some(SearchEvent::Proposals(1)));
    assert_eq!(field.proposals()[0].street, "Lyon");
    assert_eq!(geocoder.calls().len(), 3);
}

#[test]
fn teardown_mid_debounce_sends_nothing() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("Paris", start);
    field.update(start + ms(200));
    field.teardown();

    assert_eq!(settle(&mut field, start + ms(5_000)), None);
    assert!(geocoder.calls().is_empty());

    field.on_input_change("Lyon", start + ms(6_000));
    drop(field);
    assert!(geocoder.calls().is_empty());
}

#[test]
fn late_answer_of_a_superseded_lookup_is_discarded() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("slow road", start);
    field.update(start + ms(500));
    assert_eq!(field.state(), FieldState::Querying);

    field.on_input_change("fast road", start + ms(510));
    assert_eq!(settle(&mut field, start + ms(1_010)), Some(SearchEvent::Proposals(1)));
    assert_eq!(field.proposals()[0].street, "fast road");

    geocoder.release();
    assert_eq!(drain(&mut field, start + ms(1_500)), None);
    assert!(field.loaders.is_empty());
    assert_eq!(field.proposals()[0].street, "fast road");
    assert_eq!(geocoder.calls().len(), 2);
}

#[test]
fn answer_arriving_after_clearing_is_discarded() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("slow lane", start);
    field.update(start + ms(500));
    field.on_input_change("", start + ms(510));

    geocoder.release();
    assert_eq!(drain(&mut field, start + ms(1_000)), None);
    assert!(field.proposals().is_empty());
}

#[test]
fn answer_still_applies_while_typing_continues() {
    let (mut field, geocoder, _) = test_field();
    let start = Instant::now();

    field.on_input_change("slow lane", start);
    field.update(start + ms(500));
    field.on_input_change("slow lane 2", start + ms(510));

    geocoder.release();
    assert_eq!(drain(&mut field, start + ms(600)), Some(SearchEvent::Proposals(1)));
    assert_eq!(field.proposals()[0].street, "slow lane");
    assert_eq!(field.state(), FieldState::Debouncing);
}

#[test]
fn panicking_geocoder_does_not_leave_the_field_querying() {
    let mut field = SearchField::new(SearchConfig::default(), Arc::new(PanickingGeocoder), |_| {});
    let start = Instant::now();

    field.on_input_change("Paris", start);
    let event = settle(&mut field, start + ms(500));

    assert!(matches!(event, Some(SearchEvent::Failed(SearchError::Network(_)))));
    assert_eq!(field.state(), FieldState::Idle);
    assert!(field.loaders.is_empty());
    assert!(field.proposals().is_empty());
}
