/// Declares a record type and its table mapping.
///
/// Every field becomes `pub name: Option<T>` and is described by a
/// [`Field`](crate::orm::Field) expression. The table name is the type name
/// unless given with `in "table"`. The [`Schema`](crate::orm::Schema) is
/// built the first time the model is used; a model without exactly one
/// primary key panics at that point.
///
/// Records serialize as a map of every field except those marked
/// [`Field::hidden`](crate::orm::Field::hidden). Unset fields are `null`.
///
/// ```rust
/// use blogweb::model;
/// use blogweb::orm::{Field, Model};
///
/// model! {
///     /// A tag attached to posts.
///     pub struct Tag in "tags" {
///         id: String = Field::string().ddl("varchar(50)").primary_key(),
///         label: String = Field::string().ddl("varchar(50)"),
///         uses: i64 = Field::integer(),
///     }
/// }
///
/// assert_eq!(Tag::schema().insert(), "insert into `tags` (`label`, `uses`, `id`) values (?, ?, ?)");
/// ```
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(in $table:literal)? {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $desc:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        $vis struct $name {
            $( $(#[$field_meta])* pub $field: ::std::option::Option<$ty>, )+
        }

        impl $crate::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::serde::Serializer,
            {
                use $crate::serde::ser::SerializeStruct as _;

                let schema = <Self as $crate::orm::Model>::schema();
                let hidden = |field: &str| schema.field(field).is_some_and($crate::orm::Field::is_hidden);
                let len = [$( stringify!($field) ),+].into_iter().filter(|f| !hidden(*f)).count();
                let mut state = serializer.serialize_struct(stringify!($name), len)?;
                $(
                    if hidden(stringify!($field)) {
                        state.skip_field(stringify!($field))?;
                    } else {
                        state.serialize_field(stringify!($field), &self.$field)?;
                    }
                )+
                state.end()
            }
        }

        impl $crate::orm::Model for $name {
            fn schema() -> &'static $crate::orm::Schema {
                static SCHEMA: ::std::sync::LazyLock<$crate::orm::Schema> =
                    ::std::sync::LazyLock::new(|| {
                        $crate::orm::Schema::builder(stringify!($name))
                            $( .table($table) )?
                            $( .field(stringify!($field), $desc) )+
                            .build()
                            .unwrap_or_else(|e| panic!("invalid model `{}`: {e}", stringify!($name)))
                    });
                &SCHEMA
            }

            fn value(&self, field: &str) -> ::std::option::Option<$crate::orm::Value> {
                match field {
                    $( stringify!($field) => self.$field.clone().map($crate::orm::Value::from), )+
                    _ => ::std::option::Option::None,
                }
            }

            fn set_value(
                &mut self,
                field: &str,
                value: $crate::orm::Value,
            ) -> ::std::result::Result<(), $crate::orm::OrmError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = <$ty as $crate::orm::ColumnValue>::from_value(value)
                                .map_err(|found| $crate::orm::OrmError::Conversion {
                                    model: stringify!($name),
                                    field: stringify!($field),
                                    expected: <$ty as $crate::orm::ColumnValue>::KIND,
                                    found: found.kind(),
                                })?;
                            ::std::result::Result::Ok(())
                        }
                    )+
                    _ => ::std::result::Result::Err($crate::orm::OrmError::UnknownField {
                        model: stringify!($name),
                        field: field.to_owned(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::orm::{Field, Model, OrmError, Value};

    crate::model! {
        struct Note {
            body: String = Field::text(),
            id: i64 = Field::integer().primary_key(),
            pinned: bool = Field::boolean(),
        }
    }

    crate::model! {
        struct Secret in "secrets" {
            id: i64 = Field::integer().primary_key(),
            token: String = Field::string().hidden(),
        }
    }

    #[test]
    fn table_defaults_to_type_name() {
        assert_eq!(Note::schema().table(), "Note");
        assert_eq!(Note::schema().primary_key(), "id");
    }

    #[test]
    fn fields_are_reachable_by_name() {
        let mut note = Note::default();
        assert_eq!(note.value("body"), None);

        note.set_value("body", Value::from("hello")).unwrap();
        note.set_value("pinned", Value::Int(1)).unwrap();
        assert_eq!(note.body.as_deref(), Some("hello"));
        assert_eq!(note.pinned, Some(true));
        assert_eq!(note.value("pinned"), Some(Value::Bool(true)));
    }

    #[test]
    fn wrong_value_type_is_reported() {
        let mut note = Note::default();
        let err = note.set_value("id", Value::from("seven")).unwrap_err();
        assert!(matches!(err, OrmError::Conversion { field: "id", expected: "int", found: "text", .. }));
        assert!(matches!(note.set_value("nope", Value::Null), Err(OrmError::UnknownField { .. })));
    }

    #[test]
    fn defaults_are_resolved_and_kept() {
        let mut note = Note::default();
        assert_eq!(note.value_or_default("pinned").unwrap(), Value::Bool(false));
        assert_eq!(note.pinned, Some(false));
        assert_eq!(note.value_or_default("body").unwrap(), Value::Null);
        assert_eq!(note.body, None);
    }

    #[test]
    fn records_serialize_every_visible_field() {
        let note = Note { body: Some("x".into()), id: Some(3), pinned: None };
        assert_eq!(
            serde_json::to_value(&note).unwrap(),
            serde_json::json!({ "body": "x", "id": 3, "pinned": null })
        );

        let secret = Secret { id: Some(1), token: Some("t0k3n".into()) };
        assert_eq!(serde_json::to_value(&secret).unwrap(), serde_json::json!({ "id": 1 }));
    }

    #[test]
    fn rows_become_records() {
        let row = [
            ("id".to_owned(), Value::Int(3)),
            ("body".to_owned(), Value::from("x")),
            ("extra".to_owned(), Value::Int(9)),
        ]
        .into_iter()
        .collect();
        let note = Note::from_row(row).unwrap();
        assert_eq!(note, Note { body: Some("x".into()), id: Some(3), pinned: None });
    }
}
