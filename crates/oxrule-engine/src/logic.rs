use crate::condition::ConditionEvaluator;
use futures::future::{BoxFuture, FutureExt};
use oxrule_common::types::{Combinator, Event, LogicNode, Rule};

/// Folds one node of a rule's tree into a verdict.
///
/// The conditions and the children are folded separately and the two
/// results combined with the node's operator. AND holds iff every condition
/// and every child holds (vacuously true when both lists are empty); OR
/// holds iff at least one does (false when both are empty). Each fold stops
/// at its first deciding operand, but the children are folded even when the
/// conditions already decided the node, so a `repeat_over` below them is
/// still counted.
pub fn evaluate_node<'a>(
    evaluator: &'a ConditionEvaluator,
    event: &'a mut Event,
    node: &'a LogicNode,
    rule: &'a Rule,
) -> BoxFuture<'a, bool> {
    async move {
        let conditions = fold_conditions(evaluator, event, node, rule).await;
        let children = fold_children(evaluator, event, node, rule).await;
        match node.operator {
            Combinator::And => conditions && children,
            Combinator::Or => conditions || children,
        }
    }
    .boxed()
}

async fn fold_conditions(
    evaluator: &ConditionEvaluator,
    event: &mut Event,
    node: &LogicNode,
    rule: &Rule,
) -> bool {
    let all = node.operator == Combinator::And;
    for condition in &node.conditions {
        if evaluator.evaluate(event, condition, rule).await != all {
            return !all;
        }
    }
    all
}

async fn fold_children(
    evaluator: &ConditionEvaluator,
    event: &mut Event,
    node: &LogicNode,
    rule: &Rule,
) -> bool {
    let all = node.operator == Combinator::And;
    for child in &node.children {
        if evaluate_node(evaluator, event, child, rule).await != all {
            return !all;
        }
    }
    all
}

/// A rule matches an event iff its root node evaluates true.
pub async fn evaluate_rule(evaluator: &ConditionEvaluator, event: &mut Event, rule: &Rule) -> bool {
    evaluate_node(evaluator, event, &rule.root_node, rule).await
}
