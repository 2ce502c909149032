//! Fluent construction of [`ProblemSpec`] values.

use optiroute_kernel::problem::{
    ConstraintCounts, DomainHints, ObjectiveSpec, ProblemSpec, VariableCounts,
};

#[derive(Debug, Clone, Default)]
pub struct ProblemSpecBuilder {
    spec: ProblemSpec,
}

impl ProblemSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small LP: 5 continuous variables, 3 linear constraints, linear objective.
    pub fn small_lp() -> Self {
        Self::new().continuous(5).linear(3).objective("linear")
    }

    pub fn problem_type(mut self, problem_type: &str) -> Self {
        self.spec.problem_type = Some(problem_type.to_string());
        self
    }

    pub fn continuous(mut self, n: u64) -> Self {
        self.variables().continuous = n;
        self
    }

    pub fn integer(mut self, n: u64) -> Self {
        self.variables().integer = n;
        self
    }

    pub fn binary(mut self, n: u64) -> Self {
        self.variables().binary = n;
        self
    }

    pub fn linear(mut self, n: u64) -> Self {
        self.constraints().linear = n;
        self
    }

    pub fn quadratic(mut self, n: u64) -> Self {
        self.constraints().quadratic = n;
        self
    }

    pub fn nonlinear(mut self, n: u64) -> Self {
        self.constraints().nonlinear = n;
        self
    }

    pub fn logical(mut self, n: u64) -> Self {
        self.constraints().logical = n;
        self
    }

    pub fn objective(mut self, kind: &str) -> Self {
        self.spec.objective = Some(ObjectiveSpec {
            kind: Some(kind.to_string()),
            count: 1,
        });
        self
    }

    pub fn objectives(mut self, kind: &str, count: u32) -> Self {
        self.spec.objective = Some(ObjectiveSpec {
            kind: Some(kind.to_string()),
            count,
        });
        self
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.spec.domain = Some(domain.to_string());
        self
    }

    pub fn time_dependent(mut self) -> Self {
        self.spec.time_dependent = true;
        self
    }

    pub fn stochastic(mut self) -> Self {
        self.spec.stochastic = true;
        self
    }

    pub fn hints(mut self, hints: DomainHints) -> Self {
        self.spec.hints = hints;
        self
    }

    pub fn build(self) -> ProblemSpec {
        self.spec
    }

    /// The problem description as JSON, for parser-level tests.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.spec).unwrap_or_default()
    }

    fn variables(&mut self) -> &mut VariableCounts {
        self.spec.variables.get_or_insert_with(VariableCounts::default)
    }

    fn constraints(&mut self) -> &mut ConstraintCounts {
        self.spec.constraints.get_or_insert_with(ConstraintCounts::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_lp_shape() {
        let spec = ProblemSpecBuilder::small_lp().build();
        assert_eq!(spec.variables.map(|v| v.continuous), Some(5));
        assert_eq!(spec.constraints.map(|c| c.linear), Some(3));
        assert_eq!(spec.objective.and_then(|o| o.kind).as_deref(), Some("linear"));
    }

    #[test]
    fn json_round_trips_through_parser() {
        let builder = ProblemSpecBuilder::new().binary(3).logical(2).domain("routing");
        let parsed = ProblemSpec::from_json(&builder.to_json()).unwrap();
        assert_eq!(parsed, builder.build());
    }
}
