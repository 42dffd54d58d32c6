//! Ranking table schemas by record version
//!
//! Each schema lists the optional episode columns a ranking table carries,
//! how episodes identify their show, and which hype list layout applies.
//! A record picks exactly one schema: the first entry of [`SHEET_SCHEMAS`]
//! whose starting version it has reached.

use crate::version::RecordVersion;

/// How ranking rows refer to a show in the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Display name
    ShowName,
    /// Numeric original id, with the older series id column as alias
    OriginalId,
}

/// Optional episode columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeField {
    OneLiner,
    Video,
    EpisodeNumber,
    AirDate,
    Watched,
}

impl EpisodeField {
    /// Normalized column names, preferred first
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            EpisodeField::OneLiner => &["oneliner"],
            EpisodeField::Video => &["video"],
            EpisodeField::EpisodeNumber => &["episodenumber", "seasonepisode", "seasonnumber"],
            EpisodeField::AirDate => &["date"],
            EpisodeField::Watched => &["watched"],
        }
    }
}

/// Hype list layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypeLayout {
    /// Current and last week's list share one table, keyed by show name
    Combined,
    /// Current list keyed by original id, last week's list in its own table
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    Base,
    V2,
    V2_2,
    V2_6,
    V3,
    V3_1,
    V4,
    V4_1,
    V5_3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetSchema {
    pub variant: SchemaVariant,
    pub since: RecordVersion,
    pub identity: Identity,
    pub fields: &'static [EpisodeField],
    pub hype: HypeLayout,
}

impl SheetSchema {
    pub fn has(&self, field: EpisodeField) -> bool {
        self.fields.contains(&field)
    }

    /// Whether episode numbers come from a column of the ranking table
    pub fn explicit_episode_number(&self) -> bool {
        self.has(EpisodeField::EpisodeNumber)
    }
}

use EpisodeField::*;

/// Highest version first
pub const SHEET_SCHEMAS: [SheetSchema; 9] = [
    SheetSchema {
        variant: SchemaVariant::V5_3,
        since: RecordVersion::new(5, 3),
        identity: Identity::OriginalId,
        fields: &[AirDate, Watched, EpisodeNumber],
        hype: HypeLayout::Split,
    },
    SheetSchema {
        variant: SchemaVariant::V4_1,
        since: RecordVersion::new(4, 1),
        identity: Identity::OriginalId,
        fields: &[Video, AirDate, Watched, EpisodeNumber],
        hype: HypeLayout::Split,
    },
    SheetSchema {
        variant: SchemaVariant::V4,
        since: RecordVersion::new(4, 0),
        identity: Identity::OriginalId,
        fields: &[Video, AirDate, Watched],
        hype: HypeLayout::Split,
    },
    SheetSchema {
        variant: SchemaVariant::V3_1,
        since: RecordVersion::new(3, 1),
        identity: Identity::OriginalId,
        fields: &[Video, AirDate, Watched],
        hype: HypeLayout::Combined,
    },
    SheetSchema {
        variant: SchemaVariant::V3,
        since: RecordVersion::new(3, 0),
        identity: Identity::OriginalId,
        fields: &[Video, AirDate, Watched],
        hype: HypeLayout::Combined,
    },
    SheetSchema {
        variant: SchemaVariant::V2_6,
        since: RecordVersion::new(2, 6),
        identity: Identity::ShowName,
        fields: &[OneLiner, Video, AirDate],
        hype: HypeLayout::Combined,
    },
    SheetSchema {
        variant: SchemaVariant::V2_2,
        since: RecordVersion::new(2, 2),
        identity: Identity::ShowName,
        fields: &[OneLiner, Video],
        hype: HypeLayout::Combined,
    },
    SheetSchema {
        variant: SchemaVariant::V2,
        since: RecordVersion::new(2, 0),
        identity: Identity::ShowName,
        fields: &[OneLiner, Video, EpisodeNumber],
        hype: HypeLayout::Combined,
    },
    SheetSchema {
        variant: SchemaVariant::Base,
        since: RecordVersion::BASE,
        identity: Identity::ShowName,
        fields: &[OneLiner, Video],
        hype: HypeLayout::Combined,
    },
];

/// The schema a record of `version` uses for every ranking table
pub fn select_schema(version: RecordVersion) -> &'static SheetSchema {
    let base = &SHEET_SCHEMAS[SHEET_SCHEMAS.len() - 1];
    SHEET_SCHEMAS
        .iter()
        .find(|schema| version >= schema.since)
        .unwrap_or(base)
}
