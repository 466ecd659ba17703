//! Uniqueness and credit invariants under parallel callers.

use std::sync::Barrier;
use std::thread;

use ftpacct::AccountStore;
use rand::Rng;

use crate::helpers::*;

const THREADS: usize = 8;

#[test]
fn test_concurrent_creates_of_one_name() {
    let store = test_store();
    let barrier = Barrier::new(THREADS);

    let successes = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let (store, barrier) = (&store, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    store.create("contested", 100 + i as u32, None).is_ok()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(successes, 1);
    assert_eq!(store.total_count(), 1);
    assert!(store.exists_name("contested"));
}

#[test]
fn test_concurrent_creates_of_one_uid() {
    let store = test_store();
    let barrier = Barrier::new(THREADS);

    let winners: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let (store, barrier) = (&store, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    let name = format!("user{i}");
                    store.create(&name, 7, None).ok().map(|_| name)
                })
            })
            .collect();
        handles.into_iter().filter_map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(winners.len(), 1);
    assert_eq!(store.name_for_uid(7).as_deref(), Some(winners[0].as_str()));
    assert_eq!(store.total_count(), 1);
}

#[test]
fn test_rename_races_create() {
    for round in 0..20 {
        let store = test_store();
        let user = create_user(&store, "original", 1);
        let barrier = Barrier::new(2);

        let (renamed, created) = thread::scope(|s| {
            let rename = s.spawn(|| {
                barrier.wait();
                user.rename("target").is_ok()
            });
            let create = s.spawn(|| {
                barrier.wait();
                store.create("target", 2, None).is_ok()
            });
            (rename.join().unwrap(), create.join().unwrap())
        });

        assert!(renamed ^ created, "round {round}: exactly one claim must win");
        let owner = store.uid_for_name("target").unwrap();
        if renamed {
            assert_eq!(owner, 1);
            assert!(store.uid_for_name("original").is_none());
            assert!(!store.exists_uid(2));
        } else {
            assert_eq!(owner, 2);
            assert_eq!(store.uid_for_name("original"), Some(1));
        }
    }
}

#[test]
fn test_concurrent_credit_deltas_are_not_lost() {
    const START: u64 = 1_000;
    const OPS: usize = 250;

    let store = test_store();
    let user = create_user(&store, "w00t", 42);
    user.incr_default_credits(START as i64).unwrap();
    user.incr_section_credits("MP3", START as i64).unwrap();

    let applied: i64 = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let user = user.clone();
                s.spawn(move || {
                    let mut rng = rand::thread_rng();
                    let mut sum = 0i64;
                    for _ in 0..OPS {
                        let delta: i64 = rng.gen_range(-50..=50);
                        let section = if i % 2 == 0 { "" } else { "MP3" };
                        match user.incr_section_credits(section, delta) {
                            Ok(_) => {
                                if section.is_empty() {
                                    sum += delta;
                                }
                            }
                            Err(e) => assert!(e.is_insufficient_credits(), "{e}"),
                        }
                    }
                    sum
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    let expected = START as i64 + applied;
    assert_eq!(user.get_default_credits().unwrap() as i64, expected);
}

#[test]
fn test_parallel_mutations_on_different_users() {
    let store = test_store();
    for i in 0..THREADS as u32 {
        create_user(&store, &format!("user{i}"), i + 1);
    }

    thread::scope(|s| {
        for i in 0..THREADS as u32 {
            let store = &store;
            s.spawn(move || {
                let user = store.load_by_uid(i + 1).unwrap();
                for n in 0..100 {
                    user.incr_default_credits(1).unwrap();
                    user.set_tagline(&format!("tick {n}")).unwrap();
                }
            });
        }
    });

    for user in store.all_users() {
        assert_eq!(user.get_default_credits().unwrap(), 100);
        assert_eq!(user.tagline().unwrap(), "tick 99");
    }
}

#[test]
fn test_group_delete_races_membership() {
    for _ in 0..20 {
        let store = store_with_groups(&[(1, "staff")]);
        let user = create_user(&store, "w00t", 42);
        let barrier = Barrier::new(2);

        let (joined, deleted) = thread::scope(|s| {
            let join = s.spawn(|| {
                barrier.wait();
                user.add_secondary_groups(&[1]).is_ok()
            });
            let delete = s.spawn(|| {
                barrier.wait();
                store.delete_group(1).is_ok()
            });
            (join.join().unwrap(), delete.join().unwrap())
        });

        // A persisted membership never points at a deleted group
        assert!(joined ^ deleted);
        if joined {
            assert!(store.groups().contains(1));
            assert_eq!(user.secondary_gids().unwrap(), vec![1]);
        } else {
            assert!(!store.groups().contains(1));
            assert!(user.secondary_gids().unwrap().is_empty());
        }
    }
}

#[test]
fn test_concurrent_creates_are_durable() {
    let (dir, store) = temp_store();
    thread::scope(|s| {
        for t in 0..THREADS as u32 {
            let store = &store;
            s.spawn(move || {
                for n in 0..10 {
                    let uid = t * 10 + n + 1;
                    store.create(&format!("u{uid}"), uid, None).unwrap();
                }
            });
        }
    });
    drop(store);

    let store = AccountStore::open_dir(dir.path()).unwrap();
    assert_eq!(store.total_count(), THREADS * 10);
    assert_eq!(store.next_free_uid().unwrap(), THREADS as u32 * 10 + 1);
}
