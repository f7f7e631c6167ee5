use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::{ListOp, ListOpType};

fn applied(ops: &[ListOp<u32>]) -> Vec<u32> {
	let mut list = Vec::new();
	for op in ops {
		op.apply(&mut list);
	}
	list
}

#[test]
fn test_weak_to_strong_application() {
	let weakest = ListOp::default().with_appended(vec![3]);
	let middle = ListOp::default().with_deleted(vec![1]).with_appended(vec![2]);
	let strongest = ListOp::default().with_appended(vec![1]);
	assert_eq!(applied(&[weakest, middle, strongest]), vec![3, 2, 1]);
}

#[test]
fn test_explicit_replaces_accumulator() {
	let weak = ListOp::default().with_appended(vec![1, 2]);
	let strong = ListOp::explicit(vec![5, 5, 4]);
	assert_eq!(applied(&[weak, strong]), vec![5, 4]);
}

#[test]
fn test_empty_explicit_clears() {
	let weak = ListOp::default().with_appended(vec![1, 2]);
	let strong = ListOp::<u32>::explicit(Vec::new());
	assert!(strong.has_keys());
	assert!(applied(&[weak, strong]).is_empty());
}

#[test]
fn test_prepend_moves_existing_items_to_front() {
	let weak = ListOp::default().with_appended(vec![1, 2, 3]);
	let strong = ListOp::default().with_prepended(vec![3, 9]);
	assert_eq!(applied(&[weak, strong]), vec![3, 9, 1, 2]);
}

#[test]
fn test_append_moves_existing_items_to_back() {
	let weak = ListOp::default().with_appended(vec![1, 2, 3]);
	let strong = ListOp::default().with_appended(vec![1]);
	assert_eq!(applied(&[weak, strong]), vec![2, 3, 1]);
}

#[test]
fn test_add_keeps_existing_position() {
	let weak = ListOp::default().with_appended(vec![1, 2]);
	let strong = ListOp::default().with_added(vec![1, 7]);
	assert_eq!(applied(&[weak, strong]), vec![1, 2, 7]);
}

#[test]
fn test_reorder_drags_following_runs() {
	let weak = ListOp::default().with_appended(vec![0, 1, 2, 3, 4]);
	let strong = ListOp::default().with_ordered(vec![3, 1]);
	// 0 precedes every ordered item; 3 drags 4, 1 drags 2.
	assert_eq!(applied(&[weak, strong]), vec![0, 3, 4, 1, 2]);
}

#[test]
fn test_translate_sees_op_type_and_can_drop() {
	let op = ListOp::default()
		.with_deleted(vec![10])
		.with_appended(vec![1, 2, 3]);
	let mut seen = Vec::new();
	let mut list = vec![10];
	op.apply_operations(&mut list, |ty, item| {
		seen.push((ty, *item));
		(*item != 2).then_some(*item)
	});
	assert_eq!(list, vec![1, 3]);
	assert_eq!(
		seen,
		vec![
			(ListOpType::Deleted, 10),
			(ListOpType::Appended, 1),
			(ListOpType::Appended, 2),
			(ListOpType::Appended, 3),
		]
	);
}

#[test]
fn test_validate_rejects_duplicates() {
	let op = ListOp::default().with_prepended(vec![1, 1]);
	assert_eq!(op.validate().unwrap_err().op, ListOpType::Prepended);
	assert!(ListOp::default().with_appended(vec![1, 2]).validate().is_ok());
}

fn arb_list_op() -> impl Strategy<Value = ListOp<u32>> {
	let items = || proptest::collection::vec(0u32..8, 0..5);
	(
		any::<bool>(),
		items(),
		items(),
		items(),
		items(),
		items(),
		items(),
	)
		.prop_map(|(explicit, ex, add, pre, app, del, ord)| {
			if explicit {
				ListOp::explicit(ex)
			} else {
				ListOp::default()
					.with_added(add)
					.with_prepended(pre)
					.with_appended(app)
					.with_deleted(del)
					.with_ordered(ord)
			}
		})
}

proptest! {
	#[test]
	fn prop_result_has_no_duplicates(ops in proptest::collection::vec(arb_list_op(), 0..6)) {
		let list = applied(&ops);
		let mut sorted = list.clone();
		sorted.sort_unstable();
		sorted.dedup();
		prop_assert_eq!(sorted.len(), list.len());
	}

	#[test]
	fn prop_explicit_ignores_weaker_opinions(
		weak in proptest::collection::vec(arb_list_op(), 0..4),
		items in proptest::collection::vec(0u32..8, 0..6),
	) {
		let explicit = ListOp::explicit(items);
		let mut with_weak = weak.clone();
		with_weak.push(explicit.clone());
		prop_assert_eq!(applied(&with_weak), applied(&[explicit]));
	}

	#[test]
	fn prop_deleted_items_are_absent(
		weak in proptest::collection::vec(arb_list_op(), 0..4),
		deleted in proptest::collection::vec(0u32..8, 1..4),
	) {
		let mut ops = weak;
		ops.push(ListOp::default().with_deleted(deleted.clone()));
		let list = applied(&ops);
		prop_assert!(deleted.iter().all(|d| !list.contains(d)));
	}
}
