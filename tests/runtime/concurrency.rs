//! Concurrency tests
//!
//! Operations on one block never interleave; operations on different
//! blocks proceed independently.

use std::sync::Arc;

use plotline_foundation::{EntityKind, LtMap, Operator, TypedId};
use plotline_storage::AtomicOperation;

use crate::seeded_manager;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_on_one_block_are_not_lost() {
    let m = Arc::new(seeded_manager());
    let root = m.root_id().clone();
    m.enqueue_or_execute_atomic_operations(
        &root,
        &[AtomicOperation::create_with(EntityKind::Character, "hero", [("gold", 0)])],
    )
    .await
    .unwrap();

    let tasks: Vec<_> = (0..64)
        .map(|_| {
            let m = Arc::clone(&m);
            let root = root.clone();
            tokio::spawn(async move {
                let add = AtomicOperation::modify(EntityKind::Character, "hero", "gold", Operator::Add, 1);
                m.enqueue_or_execute_atomic_operations(&root, &[add]).await.unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let block = m.get_block(&root).await.unwrap();
    let gold = block
        .current_world_state()
        .unwrap()
        .find_entity(&TypedId::character("hero"), false)
        .and_then(|e| e.try_get::<i64>("gold"));
    assert_eq!(gold, Some(64));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn children_are_created_concurrently() {
    let m = Arc::new(seeded_manager());

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let m = Arc::clone(&m);
            tokio::spawn(async move { m.create_child(None, LtMap::new()).await.unwrap().id().clone() })
        })
        .collect();
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }

    assert_eq!(m.len(), 33);
    let root = m.get_block(&m.root_id().clone()).await.unwrap();
    assert_eq!(root.block().children().len(), 32);
    for id in &ids {
        assert!(root.block().children().contains(id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn structural_edits_and_completions_do_not_deadlock() {
    let m = Arc::new(seeded_manager());
    let root = m.root_id().clone();
    let mut parents = Vec::new();
    for _ in 0..4 {
        let child = m.create_child(None, LtMap::new()).await.unwrap();
        m.handle_workflow_completion(child.id(), true, String::new(), Vec::new(), None)
            .await
            .unwrap();
        parents.push(child.id().clone());
    }

    let mut tasks = Vec::new();
    for i in 0..16 {
        let m = Arc::clone(&m);
        let from = parents[i % 4].clone();
        let to = parents[(i + 1) % 4].clone();
        let root = root.clone();
        tasks.push(tokio::spawn(async move {
            if let Ok(block) = m.create_block_manually(&from, None).await {
                // Either outcome is fine; the tree may have shifted under us
                let _ = m.move_block_manually(block.id(), &to).await;
                let _ = m.delete_block_manually(block.id(), false, false).await;
            }
            let _ = m.create_child(Some(&root), LtMap::new()).await;
        }));
    }
    let all = async {
        for task in tasks {
            task.await.unwrap();
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(10), all)
        .await
        .expect("structural edits deadlocked");

    for node in m.nodes() {
        for child in &node.children {
            assert!(m.contains(child.as_str()), "dangling child {child}");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossed_moves_never_detach_a_subtree() {
    for _ in 0..50 {
        // root → m → a → d and root → n → x → p
        let m = Arc::new(seeded_manager());
        let root = m.root_id().clone();
        let chain = |parent: plotline_block::BlockId| {
            let m = Arc::clone(&m);
            async move { m.create_block_manually(&parent, None).await.unwrap().id().clone() }
        };
        let left = chain(root.clone()).await;
        let a = chain(left).await;
        let d = chain(a.clone()).await;
        let right = chain(root.clone()).await;
        let x = chain(right).await;
        let p = chain(x.clone()).await;

        let first = {
            let m = Arc::clone(&m);
            let (x, d) = (x.clone(), d.clone());
            tokio::spawn(async move { m.move_block_manually(&x, &d).await })
        };
        let second = {
            let m = Arc::clone(&m);
            let (a, p) = (a.clone(), p.clone());
            tokio::spawn(async move { m.move_block_manually(&a, &p).await })
        };
        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(first.is_err() || second.is_err(), "both crossed moves committed");

        for id in m.block_ids() {
            let path = m.get_path_to_root(&id);
            assert_eq!(path.first(), Some(&root), "{id} no longer reaches the root");
        }
    }
}
