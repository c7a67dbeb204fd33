//! Integration tests for game settings

use plotline_foundation::Value;
use plotline_storage::GameState;

#[test]
fn settings_are_independent_per_clone() {
    let mut parent: GameState = [("chapter", Value::Int(1))].into_iter().collect();
    let child = parent.clone();
    parent.set("chapter", 2);

    assert_eq!(child.get("chapter"), Some(&Value::Int(1)));
    assert_eq!(parent.all_settings().len(), 1);
}
