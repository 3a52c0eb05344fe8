use glimpse_core::{
    FocusKind, FocusTarget, HandlerConfig, HandlerError, ObjectHandler, Preview, PreviewContent,
    PreviewObject, TypeKey,
};

/// Shows `String` values as text lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextObjectHandler;

impl TextObjectHandler {
    pub const ID: &'static str = "text-object";

    /// Build from a configuration. There are no options.
    pub fn from_config(config: &HandlerConfig) -> Result<Self, HandlerError> {
        if config.has_options() {
            return Err(HandlerError::InvalidConfig {
                id: Self::ID.to_string(),
                message: "no options supported".to_string(),
            });
        }
        Ok(Self)
    }
}

impl ObjectHandler for TextObjectHandler {
    fn can_handle(&self, ty: TypeKey) -> bool {
        ty.is::<String>() || ty.is::<&'static str>()
    }

    fn create(&self, object: &dyn PreviewObject) -> Result<Preview, HandlerError> {
        let any = object.as_any();
        let text = any
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| any.downcast_ref::<&'static str>().copied())
            .ok_or_else(|| HandlerError::render(format!("Not a string: {}", object.type_key())))?;

        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let total_lines = lines.len();
        Ok(Preview::new(PreviewContent::Text { lines, total_lines })
            .with_focus(FocusTarget::new(FocusKind::Text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_str() {
        let handler = TextObjectHandler;
        assert!(handler.can_handle(TypeKey::of::<String>()));
        assert!(handler.can_handle(TypeKey::of::<&'static str>()));
        assert!(!handler.can_handle(TypeKey::of::<u8>()));

        let owned = String::from("one\ntwo");
        let preview = handler.create(&owned).unwrap();
        assert!(matches!(preview.content(), PreviewContent::Text { total_lines: 2, .. }));

        let borrowed: &'static str = "solo";
        let preview = handler.create(&borrowed).unwrap();
        assert!(matches!(preview.content(), PreviewContent::Text { total_lines: 1, .. }));
    }

    #[test]
    fn test_wrong_type_is_render_error() {
        let err = TextObjectHandler.create(&42u32).unwrap_err();
        assert!(matches!(err, HandlerError::Render { .. }));
    }
}
