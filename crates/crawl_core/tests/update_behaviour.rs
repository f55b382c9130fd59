use std::sync::Once;

use crawl_core::{
    update, DetailResult, Effect, ItemReference, ListSource, Msg, PhaseState, PipelineState,
    Stage,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn item(title: &str, id: u32) -> ItemReference {
    ItemReference::new(title, format!("https://example.com/detail/id/{id}.html"))
}

fn started() -> PipelineState {
    let (state, effects) = update(PipelineState::new(), Msg::Start);
    assert_eq!(effects, vec![Effect::CheckListPhase]);
    state
}

#[test]
fn complete_list_is_loaded_not_crawled() {
    init_logging();
    let (state, effects) = update(started(), Msg::ListPhaseChecked(PhaseState::Complete));

    assert_eq!(state.stage(), Stage::LoadingList);
    assert_eq!(effects, vec![Effect::LoadList]);
}

#[test]
fn missing_list_is_crawled() {
    init_logging();
    let (state, effects) = update(started(), Msg::ListPhaseChecked(PhaseState::NotStarted));

    assert_eq!(state.stage(), Stage::CrawlingList);
    assert_eq!(effects, vec![Effect::CrawlList]);
}

#[test]
fn crawled_list_is_deduped_before_detail_check() {
    init_logging();
    let (state, _) = update(started(), Msg::ListPhaseChecked(PhaseState::NotStarted));
    let (state, effects) = update(
        state,
        Msg::ListCrawled(vec![item("a", 1), item("b", 2), item("a-dup", 1)]),
    );

    assert_eq!(state.stage(), Stage::CheckingDetail);
    assert_eq!(state.items(), &[item("a", 1), item("b", 2)]);
    assert_eq!(effects, vec![Effect::CheckDetailPhase { item_count: 2 }]);

    let summary = state.summary();
    assert_eq!(summary.list_source, Some(ListSource::Crawled));
    assert_eq!(summary.raw_items, 3);
    assert_eq!(summary.duplicates_removed, 1);
}

#[test]
fn complete_detail_phase_is_skipped() {
    init_logging();
    let (state, _) = update(started(), Msg::ListPhaseChecked(PhaseState::Complete));
    let (state, _) = update(state, Msg::ListLoaded(vec![item("a", 1)]));
    let (state, effects) = update(state, Msg::DetailPhaseChecked(PhaseState::Complete));

    assert_eq!(state.stage(), Stage::Done);
    assert_eq!(effects, vec![Effect::Finish]);
    assert_eq!(state.summary().detail, Some(DetailResult::Skipped));
    assert_eq!(state.summary().list_source, Some(ListSource::Loaded));
}

#[test]
fn detail_phase_runs_over_deduped_items_then_finishes() {
    init_logging();
    let (state, _) = update(started(), Msg::ListPhaseChecked(PhaseState::NotStarted));
    let (state, _) = update(
        state,
        Msg::ListCrawled(vec![item("a", 1), item("a", 1), item("c", 3)]),
    );
    let (state, effects) = update(state, Msg::DetailPhaseChecked(PhaseState::NotStarted));

    assert_eq!(state.stage(), Stage::CrawlingDetail);
    assert_eq!(
        effects,
        vec![Effect::CrawlDetail {
            items: vec![item("a", 1), item("c", 3)]
        }]
    );

    let (state, effects) = update(
        state,
        Msg::DetailCrawled {
            succeeded: 1,
            failed: 1,
        },
    );
    assert_eq!(state.stage(), Stage::Done);
    assert_eq!(effects, vec![Effect::Finish]);
    assert_eq!(
        state.summary().detail,
        Some(DetailResult::Crawled {
            succeeded: 1,
            failed: 1
        })
    );
}

#[test]
fn out_of_order_messages_are_ignored() {
    init_logging();
    let state = PipelineState::new();
    let (state, effects) = update(state, Msg::ListCrawled(vec![item("a", 1)]));
    assert_eq!(state.stage(), Stage::Idle);
    assert!(effects.is_empty());

    let state = started();
    let (state, effects) = update(state, Msg::DetailPhaseChecked(PhaseState::Complete));
    assert_eq!(state.stage(), Stage::CheckingList);
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::Start);
    assert_eq!(state.stage(), Stage::CheckingList);
    assert!(effects.is_empty());
}
