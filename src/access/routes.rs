//! Route-to-module declarations for module-scoped routes.

/// A module-scoped route: its name, axum path pattern and declared module.
/// `module: None` means the module comes from the `:module` path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRoute {
    pub name: &'static str,
    pub path: &'static str,
    pub module: Option<&'static str>,
}

pub const MODULE_ROUTES: &[ModuleRoute] = &[
    ModuleRoute { name: "modules.dashboard", path: "/modules/:module/dashboard", module: None },
    ModuleRoute { name: "modules.hr.employees", path: "/hr/employees", module: Some("hr") },
    ModuleRoute { name: "modules.crm.contacts", path: "/crm/contacts", module: Some("crm") },
    ModuleRoute { name: "modules.inventory.items", path: "/inventory/items", module: Some("inventory") },
    ModuleRoute { name: "modules.core.settings", path: "/core/settings", module: Some("core") },
];

pub fn route_by_path(path: &str) -> Option<&'static ModuleRoute> {
    MODULE_ROUTES.iter().find(|route| route.path == path)
}

pub fn route_by_name(name: &str) -> Option<&'static ModuleRoute> {
    MODULE_ROUTES.iter().find(|route| route.name == name)
}

/// Second segment of a dotted route name: `modules.hr.dashboard` -> `hr`.
pub fn module_from_route_name(name: &str) -> Option<&str> {
    let mut segments = name.split('.');
    let _prefix = segments.next()?;
    let module = segments.next()?;
    // A bare `modules.dashboard` has no module segment.
    segments.next()?;
    (!module.is_empty()).then_some(module)
}

/// Module code requested by a route. The path parameter wins, then the
/// declared table, then the dotted route name.
pub fn requested_module(route_param: Option<&str>, route_name: Option<&str>) -> Option<String> {
    if let Some(param) = route_param.filter(|p| !p.is_empty()) {
        return Some(param.to_string());
    }

    let name = route_name?;
    if let Some(module) = route_by_name(name).and_then(|route| route.module) {
        return Some(module.to_string());
    }
    module_from_route_name(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_module_from_dotted_name() {
        assert_eq!(module_from_route_name("modules.hr.dashboard"), Some("hr"));
        assert_eq!(module_from_route_name("modules.dashboard"), None);
        assert_eq!(module_from_route_name("login"), None);
    }

    #[test]
    fn route_parameter_takes_precedence() {
        let module = requested_module(Some("crm"), Some("modules.hr.employees"));
        assert_eq!(module.as_deref(), Some("crm"));
    }

    #[test]
    fn declared_module_beats_name_inference() {
        assert_eq!(requested_module(None, Some("modules.hr.employees")).as_deref(), Some("hr"));
        assert_eq!(requested_module(None, Some("modules.pos.orders")).as_deref(), Some("pos"));
        assert_eq!(requested_module(None, None), None);
    }

    #[test]
    fn every_declared_route_resolves_by_path() {
        for route in MODULE_ROUTES {
            assert_eq!(route_by_path(route.path), Some(route));
        }
    }
}
