//! Shared fixtures: model definitions and database path helpers.
#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;

use orm_micro::prelude::*;
use tempfile::tempdir;

pub fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Default, Clone)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
}

impl Model for User {
    const KEY: &'static str = "User";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "id",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<User>()
                            .map(|user| FieldValue::Scalar(SqlValue::nullable(user.id)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(user) = any.downcast_mut::<User>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                user.id = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .primary()
            .autoincrement(),
            FieldDescriptor::new(
                "name",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<User>()
                            .map(|user| FieldValue::Scalar(SqlValue::Text(user.name.clone())))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(user) = any.downcast_mut::<User>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(SqlValue::Text(text)) => {
                                user.name = text;
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .not_null(),
            FieldDescriptor::new(
                "age",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<User>()
                            .map(|user| FieldValue::Scalar(SqlValue::nullable(user.age)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(user) = any.downcast_mut::<User>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                user.age = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            ),
        ]
    }
}

/// References `User` through an inferred foreign key.
#[derive(Debug, Default, Clone)]
pub struct Profile {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub bio: Option<String>,
}

impl Model for Profile {
    const KEY: &'static str = "Profile";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "id",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Profile>()
                            .map(|profile| FieldValue::Scalar(SqlValue::nullable(profile.id)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(profile) = any.downcast_mut::<Profile>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                profile.id = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .primary()
            .autoincrement(),
            FieldDescriptor::new(
                "user",
                DeclaredType::Object { model_key: "User" },
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Profile>().map(|profile| {
                            FieldValue::Refs(vec![ForeignRef {
                                identifier: profile.user_id.map(SqlValue::Int),
                            }])
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(profile) = any.downcast_mut::<Profile>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Refs(refs) => {
                                profile.user_id = refs
                                    .into_iter()
                                    .next()
                                    .and_then(|r| r.identifier)
                                    .and_then(|v| v.as_int());
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .foreign_key(ForeignKeyRef::Inferred),
            FieldDescriptor::new(
                "bio",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Profile>().map(|profile| {
                            FieldValue::Scalar(SqlValue::nullable(profile.bio.clone()))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(profile) = any.downcast_mut::<Profile>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                profile.bio = v.as_text().map(str::to_owned);
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            ),
        ]
    }
}

/// Carries a string element collection.
#[derive(Debug, Default, Clone)]
pub struct Track {
    pub id: Option<i64>,
    pub title: String,
    pub tags: Vec<String>,
}

impl Model for Track {
    const KEY: &'static str = "Track";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "id",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Track>()
                            .map(|track| FieldValue::Scalar(SqlValue::nullable(track.id)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(track) = any.downcast_mut::<Track>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                track.id = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .primary()
            .autoincrement(),
            FieldDescriptor::new(
                "title",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Track>()
                            .map(|track| FieldValue::Scalar(SqlValue::Text(track.title.clone())))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(track) = any.downcast_mut::<Track>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(SqlValue::Text(text)) => {
                                track.title = text;
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .not_null(),
            FieldDescriptor::new(
                "tags",
                DeclaredType::List {
                    element: Some(Box::new(DeclaredType::Scalar(ScalarKind::Text))),
                },
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Track>().map(|track| {
                            FieldValue::List(
                                track
                                    .tags
                                    .iter()
                                    .map(|tag| SqlValue::Text(tag.clone()))
                                    .collect(),
                            )
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(track) = any.downcast_mut::<Track>() else {
                            return false;
                        };
                        match value {
                            FieldValue::List(values) => {
                                track.tags = values
                                    .into_iter()
                                    .filter_map(|v| v.as_text().map(str::to_owned))
                                    .collect();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shade {
    #[default]
    Red,
    Green,
    Blue,
}

pub static SHADE_META: EnumMeta = EnumMeta {
    name: "Shade",
    variants: &["Red", "Green", "Blue"],
};

impl Shade {
    pub fn as_enum_value(self) -> EnumValue {
        match self {
            Shade::Red => EnumValue::new("Red", 0),
            Shade::Green => EnumValue::new("Green", 1),
            Shade::Blue => EnumValue::new("Blue", 2),
        }
    }

    pub fn from_enum_value(value: &EnumValue) -> Option<Shade> {
        match value.name.as_str() {
            "Red" => Some(Shade::Red),
            "Green" => Some(Shade::Green),
            "Blue" => Some(Shade::Blue),
            _ => None,
        }
    }
}

/// Stores the same enum under both storage modes.
#[derive(Debug, Default, Clone)]
pub struct Palette {
    pub id: Option<i64>,
    pub favorite: Option<Shade>,
    pub accent: Option<Shade>,
}

impl Model for Palette {
    const KEY: &'static str = "Palette";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "id",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Palette>()
                            .map(|palette| FieldValue::Scalar(SqlValue::nullable(palette.id)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(palette) = any.downcast_mut::<Palette>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                palette.id = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .primary()
            .autoincrement(),
            FieldDescriptor::new(
                "favorite",
                DeclaredType::Enum(&SHADE_META),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Palette>().map(|palette| {
                            FieldValue::Enum(palette.favorite.map(Shade::as_enum_value))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(palette) = any.downcast_mut::<Palette>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Enum(v) => {
                                palette.favorite =
                                    v.as_ref().and_then(Shade::from_enum_value);
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            ),
            FieldDescriptor::new(
                "accent",
                DeclaredType::Enum(&SHADE_META),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Palette>().map(|palette| {
                            FieldValue::Enum(palette.accent.map(Shade::as_enum_value))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(palette) = any.downcast_mut::<Palette>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Enum(v) => {
                                palette.accent = v.as_ref().and_then(Shade::from_enum_value);
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .enum_storage(EnumStorage::Ordinal),
        ]
    }
}

pub struct MinutesToSeconds;

impl ValueConverter for MinutesToSeconds {
    fn input(&self) -> ScalarKind {
        ScalarKind::I64
    }
    fn output(&self) -> ScalarKind {
        ScalarKind::I64
    }
    fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        match value {
            SqlValue::Int(minutes) => Ok(SqlValue::Int(minutes * 60)),
            other => Ok(other),
        }
    }
    fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        match value {
            SqlValue::Int(seconds) => Ok(SqlValue::Int(seconds / 60)),
            other => Ok(other),
        }
    }
}

pub struct IntToText;

impl ValueConverter for IntToText {
    fn input(&self) -> ScalarKind {
        ScalarKind::I64
    }
    fn output(&self) -> ScalarKind {
        ScalarKind::Text
    }
    fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        match value {
            SqlValue::Int(n) => Ok(SqlValue::Text(n.to_string())),
            other => Ok(other),
        }
    }
    fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        match value {
            SqlValue::Text(text) => text
                .parse::<i64>()
                .map(SqlValue::Int)
                .map_err(|e| OrmError::Mapping(e.to_string())),
            other => Ok(other),
        }
    }
}

fn song_fields(converters: Vec<Arc<dyn ValueConverter>>) -> Vec<FieldDescriptor> {
    let mut duration = FieldDescriptor::new(
        "duration",
        DeclaredType::Scalar(ScalarKind::I64),
        FieldAccessor {
            get: |any: &dyn Any| {
                let song = any
                    .downcast_ref::<Song>()
                    .map(|song| FieldValue::Scalar(SqlValue::nullable(song.duration_minutes)));
                song.or_else(|| {
                    any.downcast_ref::<BrokenSong>().map(|song| {
                        FieldValue::Scalar(SqlValue::nullable(song.duration_minutes))
                    })
                })
            },
            set: Some(|any: &mut dyn Any, value: FieldValue| {
                let FieldValue::Scalar(v) = value else {
                    return false;
                };
                if let Some(song) = any.downcast_mut::<Song>() {
                    song.duration_minutes = v.as_int();
                    return true;
                }
                if let Some(song) = any.downcast_mut::<BrokenSong>() {
                    song.duration_minutes = v.as_int();
                    return true;
                }
                false
            }),
        },
    );
    for converter in converters {
        duration = duration.converter(converter);
    }
    vec![
        FieldDescriptor::new(
            "id",
            DeclaredType::Scalar(ScalarKind::I64),
            FieldAccessor {
                get: |any: &dyn Any| {
                    let id = any
                        .downcast_ref::<Song>()
                        .map(|song| song.id)
                        .or_else(|| any.downcast_ref::<BrokenSong>().map(|song| song.id));
                    id.map(|id| FieldValue::Scalar(SqlValue::nullable(id)))
                },
                set: Some(|any: &mut dyn Any, value: FieldValue| {
                    let FieldValue::Scalar(v) = value else {
                        return false;
                    };
                    if let Some(song) = any.downcast_mut::<Song>() {
                        song.id = v.as_int();
                        return true;
                    }
                    if let Some(song) = any.downcast_mut::<BrokenSong>() {
                        song.id = v.as_int();
                        return true;
                    }
                    false
                }),
            },
        )
        .primary()
        .autoincrement(),
        duration,
    ]
}

/// Duration minutes stored as text seconds through a two-step chain.
#[derive(Debug, Default, Clone)]
pub struct Song {
    pub id: Option<i64>,
    pub duration_minutes: Option<i64>,
}

impl Model for Song {
    const KEY: &'static str = "Song";

    fn fields() -> Vec<FieldDescriptor> {
        song_fields(vec![Arc::new(MinutesToSeconds), Arc::new(IntToText)])
    }
}

/// Same shape as [`Song`] but with the converters in an order that cannot
/// chain, so the whole chain is discarded.
#[derive(Debug, Default, Clone)]
pub struct BrokenSong {
    pub id: Option<i64>,
    pub duration_minutes: Option<i64>,
}

impl Model for BrokenSong {
    const KEY: &'static str = "BrokenSong";

    fn fields() -> Vec<FieldDescriptor> {
        song_fields(vec![Arc::new(IntToText), Arc::new(MinutesToSeconds)])
    }
}

/// Carries a string element collection declared NOT NULL.
#[derive(Debug, Default, Clone)]
pub struct Checklist {
    pub id: Option<i64>,
    pub items: Vec<String>,
}

impl Model for Checklist {
    const KEY: &'static str = "Checklist";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "id",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Checklist>()
                            .map(|list| FieldValue::Scalar(SqlValue::nullable(list.id)))
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(list) = any.downcast_mut::<Checklist>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                list.id = v.as_int();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .primary()
            .autoincrement(),
            FieldDescriptor::new(
                "items",
                DeclaredType::List {
                    element: Some(Box::new(DeclaredType::Scalar(ScalarKind::Text))),
                },
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Checklist>().map(|list| {
                            FieldValue::List(
                                list.items
                                    .iter()
                                    .map(|item| SqlValue::Text(item.clone()))
                                    .collect(),
                            )
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(list) = any.downcast_mut::<Checklist>() else {
                            return false;
                        };
                        match value {
                            FieldValue::List(values) => {
                                list.items = values
                                    .into_iter()
                                    .filter_map(|v| v.as_text().map(str::to_owned))
                                    .collect();
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .not_null(),
        ]
    }
}

/// Rejects every integer on the way to the database.
pub struct RefusingConverter;

impl ValueConverter for RefusingConverter {
    fn input(&self) -> ScalarKind {
        ScalarKind::I64
    }
    fn output(&self) -> ScalarKind {
        ScalarKind::I64
    }
    fn to_sql(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        match value {
            SqlValue::Int(_) => Err(OrmError::Mapping("reading out of range".into())),
            other => Ok(other),
        }
    }
    fn to_model(&self, value: SqlValue) -> Result<SqlValue, OrmError> {
        Ok(value)
    }
}

fn sensor_fields(required: bool) -> Vec<FieldDescriptor> {
    let mut reading = FieldDescriptor::new(
        "reading",
        DeclaredType::Scalar(ScalarKind::I64),
        FieldAccessor {
            get: |any: &dyn Any| {
                let sensor = any
                    .downcast_ref::<Sensor>()
                    .map(|sensor| FieldValue::Scalar(SqlValue::nullable(sensor.reading)));
                sensor.or_else(|| {
                    any.downcast_ref::<CalibratedSensor>()
                        .map(|sensor| FieldValue::Scalar(SqlValue::nullable(sensor.reading)))
                })
            },
            set: None,
        },
    )
    .converter(Arc::new(RefusingConverter));
    if required {
        reading = reading.not_null();
    }
    vec![
        FieldDescriptor::new(
            "id",
            DeclaredType::Scalar(ScalarKind::I64),
            FieldAccessor {
                get: |any: &dyn Any| {
                    let id = any
                        .downcast_ref::<Sensor>()
                        .map(|sensor| sensor.id)
                        .or_else(|| any.downcast_ref::<CalibratedSensor>().map(|s| s.id));
                    id.map(|id| FieldValue::Scalar(SqlValue::nullable(id)))
                },
                set: None,
            },
        )
        .primary()
        .autoincrement(),
        reading,
    ]
}

/// Nullable reading behind a converter that always rejects it.
#[derive(Debug, Default, Clone)]
pub struct Sensor {
    pub id: Option<i64>,
    pub reading: Option<i64>,
}

impl Model for Sensor {
    const KEY: &'static str = "Sensor";

    fn fields() -> Vec<FieldDescriptor> {
        sensor_fields(false)
    }
}

/// Same shape as [`Sensor`] but with the reading declared NOT NULL.
#[derive(Debug, Default, Clone)]
pub struct CalibratedSensor {
    pub id: Option<i64>,
    pub reading: Option<i64>,
}

impl Model for CalibratedSensor {
    const KEY: &'static str = "CalibratedSensor";

    fn fields() -> Vec<FieldDescriptor> {
        sensor_fields(true)
    }
}

/// Optional field declared NOT NULL, for constraint-violation tests.
#[derive(Debug, Default, Clone)]
pub struct Badge {
    pub code: Option<String>,
}

impl Model for Badge {
    const KEY: &'static str = "Badge";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "code",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Badge>().map(|badge| {
                            FieldValue::Scalar(SqlValue::nullable(badge.code.clone()))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(badge) = any.downcast_mut::<Badge>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                badge.code = v.as_text().map(str::to_owned);
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .not_null(),
        ]
    }
}

/// Declares two primary keys; schema derivation must reject it.
#[derive(Debug, Default, Clone)]
pub struct TwoKeys {
    pub first: Option<i64>,
    pub second: Option<i64>,
}

impl Model for TwoKeys {
    const KEY: &'static str = "TwoKeys";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "first",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<TwoKeys>()
                            .map(|k| FieldValue::Scalar(SqlValue::nullable(k.first)))
                    },
                    set: None,
                },
            )
            .primary(),
            FieldDescriptor::new(
                "second",
                DeclaredType::Scalar(ScalarKind::I64),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<TwoKeys>()
                            .map(|k| FieldValue::Scalar(SqlValue::nullable(k.second)))
                    },
                    set: None,
                },
            )
            .primary(),
        ]
    }
}

/// No primary key; the unique column serves as the identifier.
#[derive(Debug, Default, Clone)]
pub struct Gadget {
    pub serial: String,
    pub label: Option<String>,
}

impl Model for Gadget {
    const KEY: &'static str = "Gadget";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new(
                "label",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Gadget>().map(|gadget| {
                            FieldValue::Scalar(SqlValue::nullable(gadget.label.clone()))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(gadget) = any.downcast_mut::<Gadget>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(v) => {
                                gadget.label = v.as_text().map(str::to_owned);
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            ),
            FieldDescriptor::new(
                "serial",
                DeclaredType::Scalar(ScalarKind::Text),
                FieldAccessor {
                    get: |any: &dyn Any| {
                        any.downcast_ref::<Gadget>().map(|gadget| {
                            FieldValue::Scalar(SqlValue::Text(gadget.serial.clone()))
                        })
                    },
                    set: Some(|any: &mut dyn Any, value: FieldValue| {
                        let Some(gadget) = any.downcast_mut::<Gadget>() else {
                            return false;
                        };
                        match value {
                            FieldValue::Scalar(SqlValue::Text(text)) => {
                                gadget.serial = text;
                                true
                            }
                            _ => false,
                        }
                    }),
                },
            )
            .unique()
            .not_null()
            .check("length(serial) > 0"),
        ]
    }
}
