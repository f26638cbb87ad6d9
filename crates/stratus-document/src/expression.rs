//! Single-pass translation of conditions and updates into backend expressions.
//!
//! Placeholder names are generated positionally so multiple conditions on
//! the same call never collide: `#i_<n>` / `:i_<n>` for conditions,
//! `#u_<n>` / `:u_<n>` for update clauses.

use std::collections::HashMap;

use serde::Serialize;

/// Comparison operator for a scalar condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

/// The test applied to one attribute.
#[derive(Debug, Clone, Serialize)]
pub enum ConditionTest {
    /// Compare against one value, consuming one placeholder binding.
    Compare(Operator, serde_json::Value),
    /// Inclusive range test, consuming two placeholder bindings.
    Between(serde_json::Value, serde_json::Value),
}

/// One conjunct of a query key condition or scan filter.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub key: String,
    pub test: ConditionTest,
}

impl Condition {
    /// Compares `key` against a scalar value.
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            key: key.into(),
            test: ConditionTest::Compare(operator, value.into()),
        }
    }

    /// Equality shorthand.
    pub fn eq(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(key, Operator::Eq, value)
    }

    /// Inclusive range test over two bounds.
    pub fn between(
        key: impl Into<String>,
        lower: impl Into<serde_json::Value>,
        upper: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            key: key.into(),
            test: ConditionTest::Between(lower.into(), upper.into()),
        }
    }
}

/// Expression text plus its name and value placeholder bindings.
#[derive(Debug, Clone, Default)]
pub(crate) struct BuiltExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Builds a conjunctive condition expression from ordered conditions.
pub(crate) fn build_conditions(conditions: &[Condition]) -> BuiltExpression {
    let mut built = BuiltExpression::default();
    let mut clauses = Vec::with_capacity(conditions.len());
    let mut value_index = 0usize;

    for (index, condition) in conditions.iter().enumerate() {
        let name = format!("#i_{index}");
        built.names.insert(name.clone(), condition.key.clone());

        match &condition.test {
            ConditionTest::Compare(operator, value) => {
                let binding = format!(":i_{value_index}");
                value_index += 1;
                clauses.push(format!("{name} {} {binding}", operator.symbol()));
                built.values.insert(binding, value.clone());
            }
            ConditionTest::Between(lower, upper) => {
                let low = format!(":i_{value_index}");
                let high = format!(":i_{}", value_index + 1);
                value_index += 2;
                clauses.push(format!("{name} BETWEEN {low} AND {high}"));
                built.values.insert(low, lower.clone());
                built.values.insert(high, upper.clone());
            }
        }
    }

    built.expression = clauses.join(" AND ");
    built
}

/// Fields to write on an item update.
///
/// Two optional maps: attributes to set unconditionally and numeric
/// attributes to increment. An update with neither is rejected by the store
/// before any backend call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Update {
    pub set: Option<serde_json::Map<String, serde_json::Value>>,
    pub increment: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute unconditionally.
    pub fn assign(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set
            .get_or_insert_with(serde_json::Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Increments a numeric attribute by `amount`.
    pub fn add(mut self, name: impl Into<String>, amount: impl Into<serde_json::Value>) -> Self {
        self.increment
            .get_or_insert_with(serde_json::Map::new)
            .insert(name.into(), amount.into());
        self
    }

    /// True when neither map contributes a clause.
    pub fn is_empty(&self) -> bool {
        self.set.as_ref().is_none_or(|m| m.is_empty())
            && self.increment.as_ref().is_none_or(|m| m.is_empty())
    }
}

/// Builds an update expression: `SET` clauses, then `ADD` clauses, comma
/// separators within a section, absent maps omitting their section.
pub(crate) fn build_update(update: &Update) -> BuiltExpression {
    let mut built = BuiltExpression::default();
    let mut sections = Vec::with_capacity(2);
    let mut index = 0usize;

    if let Some(set) = update.set.as_ref().filter(|m| !m.is_empty()) {
        let mut clauses = Vec::with_capacity(set.len());
        for (attribute, value) in set {
            let name = format!("#u_{index}");
            let binding = format!(":u_{index}");
            index += 1;
            clauses.push(format!("{name} = {binding}"));
            built.names.insert(name, attribute.clone());
            built.values.insert(binding, value.clone());
        }
        sections.push(format!("SET {}", clauses.join(", ")));
    }

    if let Some(increment) = update.increment.as_ref().filter(|m| !m.is_empty()) {
        let mut clauses = Vec::with_capacity(increment.len());
        for (attribute, amount) in increment {
            let name = format!("#u_{index}");
            let binding = format!(":u_{index}");
            index += 1;
            clauses.push(format!("{name} {binding}"));
            built.names.insert(name, attribute.clone());
            built.values.insert(binding, amount.clone());
        }
        sections.push(format!("ADD {}", clauses.join(", ")));
    }

    built.expression = sections.join(" ");
    built
}
