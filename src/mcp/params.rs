/// Generates a parameter struct together with its JSON schema and extraction.
///
/// Required fields are plain values and fail extraction with
/// `MissingField` when absent or of the wrong JSON type; optional fields are
/// `Option`s and read as `None` in the same situations.
#[macro_export]
macro_rules! tool_params {
    (
        $struct_name:ident
        $(, required($name:ident: $type:ident, $desc:expr))*
        $(, optional($opt_name:ident: $opt_type:ident, $opt_desc:expr))*
        $(,)?
    ) => {
        #[derive(Debug)]
        pub struct $struct_name {
            $(pub $name: tool_params!(@rust_type $type),)*
            $(pub $opt_name: Option<tool_params!(@rust_type $opt_type)>,)*
        }

        impl $crate::mcp::ToolParams for $struct_name {
            fn input_schema() -> serde_json::Value {
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        $(
                            stringify!($name): {
                                "type": tool_params!(@json_type $type),
                                "description": $desc
                            },
                        )*
                        $(
                            stringify!($opt_name): {
                                "type": tool_params!(@json_type $opt_type),
                                "description": $opt_desc
                            },
                        )*
                    },
                    "required": [$(stringify!($name)),*]
                })
            }

            fn extract_params(
                arguments: &serde_json::Value,
            ) -> $crate::error::CalendarResult<Self> {
                Ok(Self {
                    $(
                        $name: tool_params!(@extract $type, arguments, stringify!($name))
                            .ok_or($crate::error::CalendarError::MissingField(stringify!($name)))?,
                    )*
                    $(
                        $opt_name: tool_params!(@extract $opt_type, arguments, stringify!($opt_name)),
                    )*
                })
            }
        }
    };

    // Type mappings
    (@json_type string) => { "string" };
    (@json_type bool) => { "boolean" };
    (@json_type i64) => { "integer" };

    (@rust_type string) => { String };
    (@rust_type bool) => { bool };
    (@rust_type i64) => { i64 };

    // Extraction
    (@extract string, $args:expr, $name:expr) => {
        $args.get($name).and_then(|v| v.as_str()).map(|s| s.to_string())
    };
    (@extract bool, $args:expr, $name:expr) => {
        $args.get($name).and_then(|v| v.as_bool())
    };
    (@extract i64, $args:expr, $name:expr) => {
        $args.get($name).and_then(|v| v.as_i64())
    };
}
