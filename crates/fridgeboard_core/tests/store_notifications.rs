use fridgeboard_core::{
    DashboardConfig, ManualClock, StateChange, StateKey, StateValue, Store, SubscriptionKey,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn store() -> Rc<Store> {
    Rc::new(Store::new(&DashboardConfig::default()))
}

#[test]
fn get_returns_latest_value_after_many_sets() {
    let store = store();
    for count in [3, 1, 4, 1, 5] {
        store.set(StateValue::WaterCount(count), false);
    }
    assert_eq!(store.get(StateKey::WaterCount), StateValue::WaterCount(5));
}

#[test]
fn equal_value_notifies_nobody_and_records_nothing() {
    let store = store();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let _subscription = store.subscribe(SubscriptionKey::AnyChange, move |_| {
        counter.set(counter.get() + 1)
    });

    assert!(!store.set(StateValue::CurrentUser("mom".to_string()), false));
    assert_eq!(calls.get(), 0);
    assert!(store.history().is_empty());
}

#[test]
fn unsubscribed_callback_misses_batched_update() {
    let store = store();
    let seen = Rc::new(RefCell::new(Vec::<StateChange>::new()));
    let sink = Rc::clone(&seen);
    let subscription = store.subscribe(SubscriptionKey::AnyChange, move |change| {
        sink.borrow_mut().push(change.clone())
    });

    subscription.unsubscribe();
    subscription.unsubscribe();
    store.update(
        [
            StateValue::WaterCount(2),
            StateValue::CurrentUser("dad".to_string()),
        ],
        false,
    );

    assert!(seen.borrow().is_empty());
    assert!(!subscription.is_active());
    assert_eq!(store.subscriber_count(SubscriptionKey::AnyChange), 0);
}

#[test]
fn subscriber_may_write_back_into_store() {
    let store = store();
    let weak = Rc::downgrade(&store);
    let _clamp = store.subscribe(StateKey::WaterCount, move |change| {
        if let (Some(store), StateValue::WaterCount(count)) = (weak.upgrade(), &change.value) {
            if *count > 8 {
                store.set(StateValue::WaterCount(8), false);
            }
        }
    });

    store.set(StateValue::WaterCount(11), false);
    assert_eq!(store.water_count(), 8);
}

#[test]
fn silent_set_records_history_without_notifying() {
    let clock = Rc::new(ManualClock::new(42));
    let store = Store::with_clock(&DashboardConfig::default(), clock);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let _subscription = store.subscribe(StateKey::WaterCount, move |_| {
        counter.set(counter.get() + 1)
    });

    assert!(store.set(StateValue::WaterCount(3), true));
    assert_eq!(calls.get(), 0);

    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_value, StateValue::WaterCount(0));
    assert_eq!(history[0].new_value, StateValue::WaterCount(3));
    assert_eq!(history[0].at_ms, 42);
}

#[test]
fn history_is_bounded_by_config() {
    let config = DashboardConfig {
        history_limit: 3,
        ..DashboardConfig::default()
    };
    let store = Store::new(&config);
    for count in 1..=10 {
        store.set(StateValue::WaterCount(count), true);
    }

    let history = store.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].new_value, StateValue::WaterCount(10));
}

#[test]
fn reset_restores_defaults_and_notifies() {
    let store = store();
    store.set(StateValue::WaterCount(6), true);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _subscription = store.subscribe(SubscriptionKey::AnyChange, move |change| {
        sink.borrow_mut().push(change.key)
    });

    assert_eq!(store.reset(), 1);
    assert_eq!(store.water_count(), 0);
    assert_eq!(*seen.borrow(), vec![StateKey::WaterCount]);
}
