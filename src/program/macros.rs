/// Payload of a macro entity. A variadic macro's parameter list ends with
/// the `...` marker.
#[derive(Debug, Default)]
pub struct MacroData {
    pub parameters: Vec<String>,
}

impl MacroData {
    pub fn is_function_like(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn is_variadic(&self) -> bool {
        self.parameters.last().map(String::as_str) == Some("...")
    }
}
