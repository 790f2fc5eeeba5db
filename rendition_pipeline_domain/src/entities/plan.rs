// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rendition Plan
//!
//! A plan is the refinable, ordered, nested sequence of transformer steps the
//! engine executes. It behaves as a singly-linked list headed by a `start`
//! sentinel, with a `current` execution cursor and a transient `groupTail`
//! insertion cursor that lets refinement nest newly discovered steps between
//! the step being executed and its successors.
//!
//! ## Structure
//!
//! Steps are stored in an arena (`Vec`) and linked by index, the idiomatic
//! Rust rendering of a pointer-linked list. Each step carries the transformer
//! name, its realized input/output descriptors, a `beginGroup` flag and an
//! `endGroup` counter. Groups express refinement nesting: the steps inserted
//! while the cursor rests on a step form that step's nested group.
//!
//! ## State Machine
//!
//! ```text
//! initial ──advance──▶ inProgress ──advance past last──▶ succeeded
//!    │                      │
//!    └──────── fail ────────┴──▶ failed
//! ```
//!
//! Once `failed` or `succeeded`, both `advance` and `fail` are no-ops. A
//! succeeded plan has no current step.
//!
//! ## Serialization
//!
//! [`Plan::to_object`] / [`Plan::from_object`] provide a structural,
//! round-trippable JSON form: an array of step nodes, each carrying `name`,
//! the input/output attribute bags as sibling keys, an optional
//! `current: true` marker, and nested groups as a `steps` array.

use crate::entities::rendition::AssetDescriptor;
use crate::RenditionError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Default ceiling on the number of steps a plan may hold.
pub const MAX_PLAN_STEPS: usize = 100;

/// Reserved name of the head sentinel.
const START_NAME: &str = "start";

/// Lifecycle state of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanState {
    Initial,
    InProgress,
    Failed,
    Succeeded,
}

impl std::fmt::Display for PlanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanState::Initial => write!(f, "initial"),
            PlanState::InProgress => write!(f, "inProgress"),
            PlanState::Failed => write!(f, "failed"),
            PlanState::Succeeded => write!(f, "succeeded"),
        }
    }
}

/// Realized input/output payloads of one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepAttributes {
    pub input: AssetDescriptor,
    pub output: AssetDescriptor,
}

/// One node of the plan: a transformer name plus its realized payloads.
///
/// Linkage and group bookkeeping are owned by the plan; steps are reachable
/// through [`Plan::current_step`] and the serialization surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    name: String,
    attributes: StepAttributes,
    next: Option<usize>,
    begin_group: bool,
    end_group: u32,
}

impl Step {
    fn sentinel() -> Self {
        Self {
            name: START_NAME.to_string(),
            attributes: StepAttributes::default(),
            next: None,
            begin_group: false,
            end_group: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &AssetDescriptor {
        &self.attributes.input
    }

    pub fn output(&self) -> &AssetDescriptor {
        &self.attributes.output
    }

    pub fn input_mut(&mut self) -> &mut AssetDescriptor {
        &mut self.attributes.input
    }

    pub fn output_mut(&mut self) -> &mut AssetDescriptor {
        &mut self.attributes.output
    }
}

/// The refinable, ordered, nested sequence of transformer steps.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Arena of nodes; index 0 is the start sentinel.
    nodes: Vec<Step>,
    /// Execution cursor: the sentinel, a step, or `None` after completion.
    current: Option<usize>,
    /// Insertion cursor for nested additions; cleared by the next advance.
    group_tail: Option<usize>,
    /// Number of real steps (the sentinel does not count).
    count: usize,
    /// Step-count ceiling.
    max_steps: usize,
    /// The engine's source descriptor, set once during refinement.
    original_input: Option<AssetDescriptor>,
    state: PlanState,
}

impl Plan {
    /// Creates an empty plan positioned at the start sentinel
    pub fn new() -> Self {
        Self {
            nodes: vec![Step::sentinel()],
            current: Some(0),
            group_tail: None,
            count: 0,
            max_steps: MAX_PLAN_STEPS,
            original_input: None,
            state: PlanState::Initial,
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Number of real steps in the plan
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the cursor still rests on the start sentinel
    pub fn is_at_start(&self) -> bool {
        self.current == Some(0)
    }

    /// Whether the plan has more work: in progress or not yet started
    pub fn in_progress(&self) -> bool {
        matches!(self.state, PlanState::Initial | PlanState::InProgress)
    }

    /// The step under the cursor; `None` at the sentinel or after completion
    pub fn current_step(&self) -> Option<&Step> {
        match self.current {
            Some(idx) if idx != 0 => Some(&self.nodes[idx]),
            _ => None,
        }
    }

    pub fn current_step_mut(&mut self) -> Option<&mut Step> {
        match self.current {
            Some(idx) if idx != 0 => Some(&mut self.nodes[idx]),
            _ => None,
        }
    }

    /// Zero-based position of the current step in list order, for naming
    /// working directories. `None` at the sentinel or after completion.
    pub fn current_position(&self) -> Option<usize> {
        let current = self.current?;
        if current == 0 {
            return None;
        }
        let mut idx = self.nodes[0].next;
        let mut position = 0;
        while let Some(i) = idx {
            if i == current {
                return Some(position);
            }
            position += 1;
            idx = self.nodes[i].next;
        }
        None
    }

    pub fn original_input(&self) -> Option<&AssetDescriptor> {
        self.original_input.as_ref()
    }

    /// Sets the original input once; later calls are no-ops
    pub fn update_original_input(&mut self, source: AssetDescriptor) {
        if self.original_input.is_none() {
            self.original_input = Some(source);
        }
    }

    /// Inserts a new step after the current insertion point.
    ///
    /// The insertion point is `groupTail` when set, otherwise `current`; the
    /// new step becomes the group tail, the insertion point is flagged as a
    /// group opener, and group-closure counters move onto the new step so
    /// nesting stays balanced.
    ///
    /// Fails when the plan would exceed its step ceiling.
    pub fn add(&mut self, name: impl Into<String>, attributes: StepAttributes) -> Result<(), RenditionError> {
        let name = name.into();
        if self.count + 1 > self.max_steps {
            return Err(RenditionError::invalid_config(format!(
                "Cannot add step '{}': plan already holds the maximum of {} steps",
                name, self.count
            )));
        }

        let insertion_point = self.group_tail.or(self.current).unwrap_or(0);

        let new_idx = self.nodes.len();
        let moved_end_group = std::mem::take(&mut self.nodes[insertion_point].end_group);
        self.nodes.push(Step {
            name,
            attributes,
            next: self.nodes[insertion_point].next,
            begin_group: false,
            end_group: 1 + moved_end_group,
        });
        self.nodes[insertion_point].next = Some(new_idx);
        self.nodes[insertion_point].begin_group = true;
        self.group_tail = Some(new_idx);
        self.count += 1;
        Ok(())
    }

    /// Moves the cursor to the next step.
    ///
    /// No-op once the plan has failed or succeeded. Clears the group tail,
    /// follows the link, and settles the state: leaving the sentinel starts
    /// progress, stepping past the last step succeeds the plan.
    pub fn advance(&mut self) -> Option<&Step> {
        if !self.in_progress() {
            return self.current_step();
        }

        self.group_tail = None;
        let next = self.current.and_then(|idx| self.nodes[idx].next);
        self.current = next;
        match next {
            Some(_) => {
                self.state = PlanState::InProgress;
            }
            None => {
                self.state = PlanState::Succeeded;
            }
        }
        self.current_step()
    }

    /// Marks the plan failed unless it already succeeded
    pub fn fail(&mut self) {
        if self.state != PlanState::Succeeded {
            self.state = PlanState::Failed;
        }
    }

    /// Iterates the real steps in list order
    pub fn steps(&self) -> PlanIter<'_> {
        PlanIter {
            plan: self,
            next: self.nodes[0].next,
        }
    }

    /// Serializes the plan to its structural JSON form.
    ///
    /// The result is an array of step nodes; nested groups appear as `steps`
    /// arrays on the node that opened them, and the step under the cursor
    /// carries `current: true`.
    pub fn to_object(&self) -> Value {
        // Stack of sibling lists; the bottom entry is the top-level array
        // (the sentinel's group).
        let mut stack: Vec<Vec<Value>> = vec![Vec::new()];

        let mut idx = self.nodes[0].next;
        while let Some(i) = idx {
            let node = &self.nodes[i];
            let mut obj = json!({ "name": node.name });
            let map = obj.as_object_mut().expect("object literal");
            if self.current == Some(i) {
                map.insert("current".to_string(), Value::Bool(true));
            }
            map.insert(
                "input".to_string(),
                serde_json::to_value(&node.attributes.input).unwrap_or(Value::Null),
            );
            map.insert(
                "output".to_string(),
                serde_json::to_value(&node.attributes.output).unwrap_or(Value::Null),
            );

            stack.last_mut().expect("root list").push(obj);
            if node.begin_group {
                stack.push(Vec::new());
            }
            for _ in 0..node.end_group {
                // The sentinel's group is the root array and never closes.
                if stack.len() > 1 {
                    Self::close_group(&mut stack);
                }
            }
            idx = node.next;
        }

        // Balance any group left open by in-flight refinement.
        while stack.len() > 1 {
            Self::close_group(&mut stack);
        }
        Value::Array(stack.pop().expect("root list"))
    }

    fn close_group(stack: &mut Vec<Vec<Value>>) {
        let group = stack.pop().expect("non-root group");
        let parent_list = stack.last_mut().expect("parent list");
        let opener = parent_list.last_mut().expect("group opener precedes its group");
        if !group.is_empty() {
            opener
                .as_object_mut()
                .expect("step node is an object")
                .insert("steps".to_string(), Value::Array(group));
        }
    }

    /// Rebuilds a plan from its structural JSON form.
    ///
    /// The rebuilt plan is structurally identical to the serialized one:
    /// nesting, sibling order, attributes, and the current marker are all
    /// preserved. A plan serialized before any advance deserializes back to
    /// the initial state.
    pub fn from_object(value: &Value) -> Result<Self, RenditionError> {
        let steps = value
            .as_array()
            .ok_or_else(|| RenditionError::SerializationError("plan must be an array of steps".to_string()))?;

        let mut plan = Plan::new();
        if !steps.is_empty() {
            plan.nodes[0].begin_group = true;
        }
        let mut current_marker = None;
        let last = Self::build_group(&mut plan, steps, &mut current_marker)?;
        // Close the sentinel's group on the last node of the walk.
        if let Some(last) = last {
            plan.nodes[last].end_group += 1;
        }
        if let Some(marker) = current_marker {
            plan.current = Some(marker);
            plan.state = PlanState::InProgress;
        }
        Ok(plan)
    }

    /// Appends one serialized group; returns the index of the last node
    /// created in the walk, which carries this group's closure.
    fn build_group(
        plan: &mut Plan,
        steps: &[Value],
        current_marker: &mut Option<usize>,
    ) -> Result<Option<usize>, RenditionError> {
        let mut last_in_walk = None;
        for step in steps {
            let obj = step
                .as_object()
                .ok_or_else(|| RenditionError::SerializationError("plan step must be an object".to_string()))?;
            let name = obj
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RenditionError::SerializationError("plan step missing name".to_string()))?;

            if plan.count + 1 > plan.max_steps {
                return Err(RenditionError::invalid_config(format!(
                    "Cannot add step '{}': plan already holds the maximum of {} steps",
                    name, plan.count
                )));
            }

            let attributes = StepAttributes {
                input: match obj.get("input") {
                    Some(v) => serde_json::from_value(v.clone())?,
                    None => AssetDescriptor::default(),
                },
                output: match obj.get("output") {
                    Some(v) => serde_json::from_value(v.clone())?,
                    None => AssetDescriptor::default(),
                },
            };

            let idx = plan.nodes.len();
            plan.nodes.push(Step {
                name: name.to_string(),
                attributes,
                next: None,
                begin_group: false,
                end_group: 0,
            });
            // Nodes are created in list order; link as we go.
            let prev = match last_in_walk {
                Some(prev) => prev,
                None => plan.link_tail(idx),
            };
            plan.nodes[prev].next = Some(idx);
            plan.count += 1;
            last_in_walk = Some(idx);

            if obj.get("current").and_then(Value::as_bool) == Some(true) {
                *current_marker = Some(idx);
            }

            if let Some(children) = obj.get("steps") {
                let children = children
                    .as_array()
                    .ok_or_else(|| RenditionError::SerializationError("steps must be an array".to_string()))?;
                if !children.is_empty() {
                    plan.nodes[idx].begin_group = true;
                    let last_child = Self::build_group(plan, children, current_marker)?;
                    if let Some(last_child) = last_child {
                        plan.nodes[last_child].end_group += 1;
                        last_in_walk = Some(last_child);
                    }
                }
            }
        }
        Ok(last_in_walk)
    }

    /// Index of the node currently at the tail of the linked walk.
    fn link_tail(&self, before: usize) -> usize {
        let mut tail = 0;
        let mut idx = self.nodes[0].next;
        while let Some(i) = idx {
            if i == before {
                break;
            }
            tail = i;
            idx = self.nodes[i].next;
        }
        tail
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the real steps in list order.
pub struct PlanIter<'a> {
    plan: &'a Plan,
    next: Option<usize>,
}

impl<'a> Iterator for PlanIter<'a> {
    type Item = &'a Step;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = &self.plan.nodes[idx];
        self.next = node.next;
        Some(node)
    }
}

impl std::fmt::Display for Plan {
    /// Depicts the list with `{` at group opens, `}` at group closes, and a
    /// `*` marker on the current node.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut open = 0i64;
        let mut idx = Some(0);
        let mut first = true;
        while let Some(i) = idx {
            let node = &self.nodes[i];
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if self.current == Some(i) {
                write!(f, "*")?;
            }
            write!(f, "{}", node.name)?;
            if node.begin_group {
                write!(f, " {{")?;
                open += 1;
            }
            for _ in 0..node.end_group {
                if open > 0 {
                    write!(f, " }}")?;
                    open -= 1;
                }
            }
            idx = node.next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ATTR_TYPE;

    fn attrs(input_type: &str, output_type: &str) -> StepAttributes {
        StepAttributes {
            input: AssetDescriptor::of_type(input_type),
            output: AssetDescriptor::of_type(output_type),
        }
    }

    #[test]
    fn test_fresh_plan_is_initial_at_start() {
        let plan = Plan::new();
        assert_eq!(plan.state(), PlanState::Initial);
        assert!(plan.is_at_start());
        assert!(plan.current_step().is_none());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn test_add_then_advance_walks_in_insertion_order() {
        let mut plan = Plan::new();
        plan.add("png", attrs("image/tiff", "image/png")).unwrap();
        plan.add("gif", attrs("image/png", "image/gif")).unwrap();
        assert_eq!(plan.len(), 2);

        let step = plan.advance().expect("first step");
        assert_eq!(step.name(), "png");
        assert_eq!(plan.state(), PlanState::InProgress);
        assert_eq!(plan.current_position(), Some(0));

        let step = plan.advance().expect("second step");
        assert_eq!(step.name(), "gif");
        assert_eq!(plan.current_position(), Some(1));

        assert!(plan.advance().is_none());
        assert_eq!(plan.state(), PlanState::Succeeded);
        assert!(plan.current_step().is_none());
    }

    #[test]
    fn test_empty_plan_succeeds_on_first_advance() {
        let mut plan = Plan::new();
        assert!(plan.advance().is_none());
        assert_eq!(plan.state(), PlanState::Succeeded);
    }

    #[test]
    fn test_refinement_nests_between_current_and_successor() {
        let mut plan = Plan::new();
        plan.add("a", attrs("1", "2")).unwrap();
        plan.add("b", attrs("2", "3")).unwrap();
        plan.advance();
        // While executing "a", refinement discovers two preparatory steps.
        plan.add("a1", attrs("1", "1.5")).unwrap();
        plan.add("a2", attrs("1.5", "2")).unwrap();

        let order: Vec<&str> = plan.steps().map(Step::name).collect();
        assert_eq!(order, vec!["a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_advance_clears_group_tail() {
        let mut plan = Plan::new();
        plan.add("a", attrs("1", "2")).unwrap();
        plan.advance();
        plan.add("a1", attrs("1", "1.5")).unwrap();
        plan.advance();
        // Insertion resumes at the new current, not at the stale tail.
        plan.add("a1x", attrs("x", "y")).unwrap();
        let order: Vec<&str> = plan.steps().map(Step::name).collect();
        assert_eq!(order, vec!["a", "a1", "a1x"]);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        let mut plan = Plan::new();
        plan.add("a", attrs("1", "2")).unwrap();
        plan.fail();
        assert_eq!(plan.state(), PlanState::Failed);
        assert!(plan.advance().is_none());
        assert_eq!(plan.state(), PlanState::Failed);

        let mut plan = Plan::new();
        plan.advance();
        assert_eq!(plan.state(), PlanState::Succeeded);
        plan.fail();
        assert_eq!(plan.state(), PlanState::Succeeded);
    }

    #[test]
    fn test_step_ceiling_names_step_and_count() {
        let mut plan = Plan::new();
        for i in 0..MAX_PLAN_STEPS {
            plan.add(format!("t{}", i), StepAttributes::default()).unwrap();
        }
        let err = plan.add("overflow", StepAttributes::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("overflow"), "message: {}", message);
        assert!(message.contains("100"), "message: {}", message);
    }

    #[test]
    fn test_update_original_input_is_write_once() {
        let mut plan = Plan::new();
        plan.update_original_input(AssetDescriptor::of_type("image/png"));
        plan.update_original_input(AssetDescriptor::of_type("image/tiff"));
        assert_eq!(plan.original_input().unwrap().media_type(), Some("image/png"));
    }

    #[test]
    fn test_to_object_shape() {
        let mut plan = Plan::new();
        plan.add("png", attrs("image/tiff", "image/png")).unwrap();
        plan.advance();

        let obj = plan.to_object();
        let steps = obj.as_array().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0]["name"], "png");
        assert_eq!(steps[0]["current"], true);
        assert_eq!(steps[0]["input"][ATTR_TYPE], "image/tiff");
        assert_eq!(steps[0]["output"][ATTR_TYPE], "image/png");
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let mut plan = Plan::new();
        plan.add("a", attrs("1", "2")).unwrap();
        plan.add("b", attrs("2", "3")).unwrap();
        plan.advance();
        plan.add("a1", attrs("1", "1.5")).unwrap();

        let obj = plan.to_object();
        let rebuilt = Plan::from_object(&obj).unwrap();

        assert_eq!(rebuilt.to_object(), obj);
        assert_eq!(
            rebuilt.steps().map(Step::name).collect::<Vec<_>>(),
            plan.steps().map(Step::name).collect::<Vec<_>>()
        );
        assert_eq!(rebuilt.current_step().unwrap().name(), "a");
        assert_eq!(rebuilt.state(), PlanState::InProgress);
    }

    #[test]
    fn test_round_trip_initial_plan() {
        let mut plan = Plan::new();
        plan.add("only", attrs("1", "2")).unwrap();
        let rebuilt = Plan::from_object(&plan.to_object()).unwrap();
        assert_eq!(rebuilt.state(), PlanState::Initial);
        assert!(rebuilt.is_at_start());
        assert_eq!(rebuilt.to_object(), plan.to_object());
    }

    #[test]
    fn test_display_depicts_groups() {
        let mut plan = Plan::new();
        plan.add("a", attrs("1", "2")).unwrap();
        plan.add("b", attrs("2", "3")).unwrap();
        plan.advance();

        let rendered = plan.to_string();
        assert!(rendered.starts_with("start {"), "rendered: {}", rendered);
        assert!(rendered.contains("*a"), "rendered: {}", rendered);
        assert_eq!(
            rendered.matches('{').count(),
            rendered.matches('}').count(),
            "rendered: {}",
            rendered
        );
    }
}
