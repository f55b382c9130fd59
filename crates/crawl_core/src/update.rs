use crate::{DetailResult, Effect, ListSource, Msg, PhaseState, PipelineState, Stage};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current stage are ignored, so a stray or
/// repeated message can never skip a phase.
pub fn update(mut state: PipelineState, msg: Msg) -> (PipelineState, Vec<Effect>) {
    let effects = match (state.stage(), msg) {
        (Stage::Idle, Msg::Start) => {
            state.set_stage(Stage::CheckingList);
            vec![Effect::CheckListPhase]
        }
        (Stage::CheckingList, Msg::ListPhaseChecked(phase)) => match phase {
            PhaseState::Complete => {
                state.set_stage(Stage::LoadingList);
                vec![Effect::LoadList]
            }
            PhaseState::NotStarted => {
                state.set_stage(Stage::CrawlingList);
                vec![Effect::CrawlList]
            }
        },
        (Stage::LoadingList, Msg::ListLoaded(items)) => {
            enter_detail_check(&mut state, items, ListSource::Loaded)
        }
        (Stage::CrawlingList, Msg::ListCrawled(items)) => {
            enter_detail_check(&mut state, items, ListSource::Crawled)
        }
        (Stage::CheckingDetail, Msg::DetailPhaseChecked(phase)) => match phase {
            PhaseState::Complete => {
                state.set_detail(DetailResult::Skipped);
                state.set_stage(Stage::Done);
                vec![Effect::Finish]
            }
            PhaseState::NotStarted => {
                state.set_stage(Stage::CrawlingDetail);
                vec![Effect::CrawlDetail {
                    items: state.items().to_vec(),
                }]
            }
        },
        (Stage::CrawlingDetail, Msg::DetailCrawled { succeeded, failed }) => {
            state.set_detail(DetailResult::Crawled { succeeded, failed });
            state.set_stage(Stage::Done);
            vec![Effect::Finish]
        }
        _ => Vec::new(),
    };

    (state, effects)
}

fn enter_detail_check(
    state: &mut PipelineState,
    items: Vec<crate::ItemReference>,
    source: ListSource,
) -> Vec<Effect> {
    state.accept_list(items, source);
    state.set_stage(Stage::CheckingDetail);
    vec![Effect::CheckDetailPhase {
        item_count: state.items().len(),
    }]
}
