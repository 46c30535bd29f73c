use funnel_flow::{
    CreditTier, FunnelRunner, Goal, InMemorySessionStorage, MortgageBalance, Outcome, Pacing,
    PropertyValue, QuizEvent, QuizStep, RecordingRenderer, Stage,
};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

fn runner() -> (FunnelRunner, RecordingRenderer) {
    let renderer = RecordingRenderer::new();
    let (runner, timers) = FunnelRunner::new(
        Arc::new(InMemorySessionStorage::new()),
        Arc::new(renderer.clone()),
        Pacing::default(),
    );
    runner.spawn_timer_loop(timers);
    (runner, renderer)
}

async fn stage(runner: &FunnelRunner, session_id: &str) -> Stage {
    runner.view(session_id).await.unwrap().stage
}

async fn enter_zip(runner: &FunnelRunner, session_id: &str) {
    runner
        .dispatch(session_id, QuizEvent::ZipInput { raw: "941-07".into() })
        .await
        .unwrap();
    let view = runner
        .dispatch(session_id, QuizEvent::ZipInput { raw: "94107".into() })
        .await
        .unwrap()
        .view;
    assert!(view.zip_submit_enabled);
    runner.dispatch(session_id, QuizEvent::SubmitZip).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn full_funnel_reaches_results() {
    let (runner, renderer) = runner();
    let (session_id, _) = runner.start().await.unwrap();

    enter_zip(&runner, &session_id).await;
    assert_eq!(stage(&runner, &session_id).await, Stage::Quiz(QuizStep::Searching));

    sleep(Duration::from_millis(2100)).await;
    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.checklist.unwrap().completed, 2);
    assert!(!view.can_go_back);

    sleep(Duration::from_millis(1500)).await;
    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.stage, Stage::Quiz(QuizStep::LendersFound));
    assert_eq!(view.lenders_found, Some(12));

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(
        stage(&runner, &session_id).await,
        Stage::Quiz(QuizStep::PropertyValue)
    );

    runner
        .dispatch(
            &session_id,
            QuizEvent::SelectPropertyValue { value: PropertyValue::From400kTo500k },
        )
        .await
        .unwrap();
    assert_eq!(
        stage(&runner, &session_id).await,
        Stage::Quiz(QuizStep::PropertyValue)
    );
    sleep(Duration::from_millis(450)).await;
    assert_eq!(
        stage(&runner, &session_id).await,
        Stage::Quiz(QuizStep::MortgageBalance)
    );

    let slid = runner
        .dispatch(
            &session_id,
            QuizEvent::SliderMoved { balance: MortgageBalance::from_slider(150_000) },
        )
        .await
        .unwrap();
    assert_eq!(slid.view.slider.unwrap().hint, "Moderate Balance");

    let submitted = runner
        .dispatch(&session_id, QuizEvent::SubmitMortgage { balance: None })
        .await
        .unwrap();
    assert_eq!(submitted.view.stage, Stage::Quiz(QuizStep::CreditTier));
    assert_eq!(submitted.view.cash.unwrap().amount, 210_000);

    runner
        .dispatch(&session_id, QuizEvent::SelectCredit { tier: CreditTier::Good })
        .await
        .unwrap();
    sleep(Duration::from_millis(450)).await;
    assert_eq!(
        stage(&runner, &session_id).await,
        Stage::Quiz(QuizStep::FinalLoading)
    );

    sleep(Duration::from_millis(3100)).await;
    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.stage, Stage::Quiz(QuizStep::GoalChoice));
    assert_eq!(view.progress_percent, 100);
    assert!(view.cash.unwrap().count_up.is_some());

    runner
        .dispatch(&session_id, QuizEvent::SelectGoal { goal: Goal::DebtConsolidation })
        .await
        .unwrap();
    sleep(Duration::from_millis(650)).await;
    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.stage, Stage::Unlocking);
    assert!(view.results.unwrap().loading);

    sleep(Duration::from_millis(2050)).await;
    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.stage, Stage::Results);
    assert_eq!(view.goal, Some(Goal::DebtConsolidation));
    let results = view.results.unwrap();
    assert!(!results.loading);
    assert!(results.lender_cards.iter().all(|card| card.cash == "$210,000"));
    assert_eq!(runner.pending_timers(&session_id), 0);

    let rendered = renderer.views(&session_id);
    assert_eq!(rendered.last().map(|view| view.stage), Some(Stage::Results));
    let mut steps: Vec<u8> = rendered.iter().filter_map(|view| view.step).collect();
    steps.dedup();
    assert_eq!(steps, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn going_back_outruns_a_pending_advance() {
    let (runner, _) = runner();
    let (session_id, _) = runner.start().await.unwrap();
    enter_zip(&runner, &session_id).await;
    sleep(Duration::from_millis(6100)).await;
    assert_eq!(
        stage(&runner, &session_id).await,
        Stage::Quiz(QuizStep::PropertyValue)
    );

    runner
        .dispatch(
            &session_id,
            QuizEvent::SelectPropertyValue { value: PropertyValue::Under200k },
        )
        .await
        .unwrap();
    let back = runner.dispatch(&session_id, QuizEvent::GoBack).await.unwrap();
    assert_eq!(back.outcome, Outcome::Applied);
    assert_eq!(back.view.stage, Stage::Quiz(QuizStep::ZipEntry));
    assert_eq!(back.view.zip_code, "94107");

    sleep(Duration::from_secs(1)).await;
    assert_eq!(stage(&runner, &session_id).await, Stage::Quiz(QuizStep::ZipEntry));
}

#[tokio::test(start_paused = true)]
async fn reset_discards_the_search_animation() {
    let (runner, _) = runner();
    let (session_id, _) = runner.start().await.unwrap();
    enter_zip(&runner, &session_id).await;
    sleep(Duration::from_millis(1200)).await;

    runner.reset(&session_id).await.unwrap();
    sleep(Duration::from_secs(10)).await;

    let view = runner.view(&session_id).await.unwrap();
    assert_eq!(view.stage, Stage::Quiz(QuizStep::ZipEntry));
    assert_eq!(view.zip_code, "");
    assert_eq!(runner.pending_timers(&session_id), 0);
}

#[tokio::test(start_paused = true)]
async fn sessions_do_not_share_answers() {
    let (runner, _) = runner();
    let (first, _) = runner.start().await.unwrap();
    let (second, _) = runner.start().await.unwrap();

    enter_zip(&runner, &first).await;
    sleep(Duration::from_millis(4000)).await;

    let view = runner.view(&second).await.unwrap();
    assert_eq!(view.stage, Stage::Quiz(QuizStep::ZipEntry));
    assert_eq!(view.zip_code, "");
    assert_eq!(
        stage(&runner, &first).await,
        Stage::Quiz(QuizStep::LendersFound)
    );
}
