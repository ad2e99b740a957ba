use std::any::type_name;

use kube::Resource;

pub fn pretty_type_name<'a, T>() -> &'a str {
    type_name::<T>().rsplit("::").next().unwrap_or_default()
}

pub trait AndIf<F> {
    fn and_if(self, condition: bool, then: F) -> Self;
}

impl<T, F> AndIf<F> for T
where
    F: FnOnce(Self) -> Self,
{
    fn and_if(self, condition: bool, then: F) -> Self {
        let mut obj = self;
        if condition {
            obj = then(obj);
        }

        obj
    }
}

/// Metadata lookups that fail with a caller-chosen error.
pub trait RequireMetadata<E> {
    fn require_name_or(&self, error: E) -> Result<&str, E>;
    fn require_namespace_or(&self, error: E) -> Result<&str, E>;
}

impl<T: Resource, E> RequireMetadata<E> for T {
    fn require_name_or(&self, error: E) -> Result<&str, E> {
        Ok(self.meta().name.as_ref().ok_or(error)?.as_str())
    }

    fn require_namespace_or(&self, error: E) -> Result<&str, E> {
        Ok(self.meta().namespace.as_ref().ok_or(error)?.as_str())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::Deployment;
    use kube::api::DeleteParams;

    use super::{pretty_type_name, AndIf};

    #[test]
    fn pretty_type_name_strips_module_path() {
        assert_eq!(pretty_type_name::<Deployment>(), "Deployment");
    }

    #[test]
    fn and_if_only_applies_when_condition_holds() {
        let untouched = DeleteParams::orphan().and_if(false, |p| p.dry_run());
        let dry = DeleteParams::orphan().and_if(true, |p| p.dry_run());

        assert!(!untouched.dry_run);
        assert!(dry.dry_run);
    }
}
