// src/schema/types.rs

use serde::Serialize;

/// How a canonical column's raw cells are typed after projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    /// Kept as text, never aggregated.
    Identifier,
    /// Kept as text; used as a group-by key.
    Category,
    /// Coerced to float; averaged.
    Score,
    /// Coerced to float; compared against [`PRESENT_CODE`].
    Presence,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Score | ColumnKind::Presence)
    }
}

/// Value of a presence column meaning the candidate sat that exam.
pub const PRESENT_CODE: f64 = 1.0;

/// Logical fields recognized in the yearly microdata export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CanonicalColumn {
    RegistrationId,
    ExamYear,
    ResidenceStateNumber,
    ResidenceStateCode,
    SchoolTypeCode,
    LanguageCode,
    ScoreNature,
    ScoreHumanities,
    ScoreLanguages,
    ScoreMath,
    ScoreEssay,
    PresenceNature,
    PresenceHumanities,
    PresenceLanguages,
    PresenceMath,
    IncomeBracket,
}

impl CanonicalColumn {
    pub const ALL: [CanonicalColumn; 16] = [
        CanonicalColumn::RegistrationId,
        CanonicalColumn::ExamYear,
        CanonicalColumn::ResidenceStateNumber,
        CanonicalColumn::ResidenceStateCode,
        CanonicalColumn::SchoolTypeCode,
        CanonicalColumn::LanguageCode,
        CanonicalColumn::ScoreNature,
        CanonicalColumn::ScoreHumanities,
        CanonicalColumn::ScoreLanguages,
        CanonicalColumn::ScoreMath,
        CanonicalColumn::ScoreEssay,
        CanonicalColumn::PresenceNature,
        CanonicalColumn::PresenceHumanities,
        CanonicalColumn::PresenceLanguages,
        CanonicalColumn::PresenceMath,
        CanonicalColumn::IncomeBracket,
    ];

    pub const SCORES: [CanonicalColumn; 5] = [
        CanonicalColumn::ScoreNature,
        CanonicalColumn::ScoreHumanities,
        CanonicalColumn::ScoreLanguages,
        CanonicalColumn::ScoreMath,
        CanonicalColumn::ScoreEssay,
    ];

    pub const PRESENCE: [CanonicalColumn; 4] = [
        CanonicalColumn::PresenceNature,
        CanonicalColumn::PresenceHumanities,
        CanonicalColumn::PresenceLanguages,
        CanonicalColumn::PresenceMath,
    ];

    /// Header text this column carries in the source export.
    pub fn alias(&self) -> &'static str {
        match self {
            CanonicalColumn::RegistrationId => "NU_INSCRICAO",
            CanonicalColumn::ExamYear => "NU_ANO",
            CanonicalColumn::ResidenceStateNumber => "CO_UF_RESIDENCIA",
            CanonicalColumn::ResidenceStateCode => "SG_UF_RESIDENCIA",
            CanonicalColumn::SchoolTypeCode => "TP_ESCOLA",
            CanonicalColumn::LanguageCode => "TP_LINGUA",
            CanonicalColumn::ScoreNature => "NU_NOTA_CN",
            CanonicalColumn::ScoreHumanities => "NU_NOTA_CH",
            CanonicalColumn::ScoreLanguages => "NU_NOTA_LC",
            CanonicalColumn::ScoreMath => "NU_NOTA_MT",
            CanonicalColumn::ScoreEssay => "NU_NOTA_REDACAO",
            CanonicalColumn::PresenceNature => "TP_PRESENCA_CN",
            CanonicalColumn::PresenceHumanities => "TP_PRESENCA_CH",
            CanonicalColumn::PresenceLanguages => "TP_PRESENCA_LC",
            CanonicalColumn::PresenceMath => "TP_PRESENCA_MT",
            CanonicalColumn::IncomeBracket => "Q006",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        use CanonicalColumn::*;
        match self {
            RegistrationId | ExamYear => ColumnKind::Identifier,
            ResidenceStateNumber | ResidenceStateCode | SchoolTypeCode | LanguageCode
            | IncomeBracket => ColumnKind::Category,
            ScoreNature | ScoreHumanities | ScoreLanguages | ScoreMath | ScoreEssay => {
                ColumnKind::Score
            }
            PresenceNature | PresenceHumanities | PresenceLanguages | PresenceMath => {
                ColumnKind::Presence
            }
        }
    }

    /// Stable name used for this column in projected tables and reports.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalColumn::RegistrationId => "RegistrationId",
            CanonicalColumn::ExamYear => "ExamYear",
            CanonicalColumn::ResidenceStateNumber => "ResidenceStateNumber",
            CanonicalColumn::ResidenceStateCode => "ResidenceStateCode",
            CanonicalColumn::SchoolTypeCode => "SchoolTypeCode",
            CanonicalColumn::LanguageCode => "LanguageCode",
            CanonicalColumn::ScoreNature => "Score_Nature",
            CanonicalColumn::ScoreHumanities => "Score_Humanities",
            CanonicalColumn::ScoreLanguages => "Score_Languages",
            CanonicalColumn::ScoreMath => "Score_Math",
            CanonicalColumn::ScoreEssay => "Score_Essay",
            CanonicalColumn::PresenceNature => "Presence_Nature",
            CanonicalColumn::PresenceHumanities => "Presence_Humanities",
            CanonicalColumn::PresenceLanguages => "Presence_Languages",
            CanonicalColumn::PresenceMath => "Presence_Math",
            CanonicalColumn::IncomeBracket => "IncomeBracket",
        }
    }

    /// Exact, case-sensitive lookup of an already-cleaned header.
    pub fn from_alias(header: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.alias() == header)
    }
}

/// School-type codes with a documented meaning. Codes outside this set are
/// still reported, just without a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SchoolType {
    NotAnswered,
    Public,
    Private,
}

impl SchoolType {
    pub const KNOWN: [SchoolType; 3] = [
        SchoolType::NotAnswered,
        SchoolType::Public,
        SchoolType::Private,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SchoolType::NotAnswered => "1",
            SchoolType::Public => "2",
            SchoolType::Private => "3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SchoolType::NotAnswered => "not_answered",
            SchoolType::Public => "public",
            SchoolType::Private => "private",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::KNOWN.iter().copied().find(|t| t.code() == code)
    }
}
