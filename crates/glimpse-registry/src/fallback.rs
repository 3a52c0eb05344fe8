use glimpse_core::{
    FocusKind, FocusTarget, HandlerError, ObjectHandler, Preview, PreviewContent, PreviewObject,
    TypeKey,
};

/// Renders any object through its debug representation.
///
/// Installed as the fallback object handler unless the catalog replaces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugObjectHandler;

impl DebugObjectHandler {
    pub const ID: &'static str = "debug-object";
}

impl ObjectHandler for DebugObjectHandler {
    fn can_handle(&self, _ty: TypeKey) -> bool {
        true
    }

    fn create(&self, object: &dyn PreviewObject) -> Result<Preview, HandlerError> {
        let lines: Vec<String> = object.describe().lines().map(str::to_owned).collect();
        let total_lines = lines.len();
        Ok(Preview::new(PreviewContent::Text { lines, total_lines })
            .with_focus(FocusTarget::new(FocusKind::Text)))
    }
}
