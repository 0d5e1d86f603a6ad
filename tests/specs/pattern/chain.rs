//! Event chain specs
//!
//! Verify ordered dispatch and stop-on-error.

use crate::prelude::*;

#[test]
fn chain_halts_on_the_failing_event() {
    let bus = EventBus::default();
    let journal = Journal::new();
    for step in ["quest.accept", "quest.travel", "quest.reward"] {
        let journal = journal.clone();
        bus.register_listener(Arc::new(
            Listener::builder(step)
                .on(step, move |event| {
                    journal.push(event.event_type());
                    if event.event_type() == "quest.travel" {
                        Err("bridge is out".into())
                    } else {
                        Ok(EventResult::Handled)
                    }
                })
                .build(),
        ))
        .unwrap();
    }

    let chain = EventPattern::chain(
        &bus,
        vec![event("quest.accept"), event("quest.travel"), event("quest.reward")],
        true,
    );
    chain.start();

    assert_eq!(chain.state(), PatternState::Failed);
    assert_eq!(chain.current_index(), 1);
    assert_eq!(journal.entries(), vec!["quest.accept", "quest.travel"]);
}
