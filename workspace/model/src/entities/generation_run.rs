use sea_orm::entity::prelude::*;

/// Outcome of a generation batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum RunStatus {
    #[sea_orm(string_value = "en_curso")]
    Running,
    #[sea_orm(string_value = "completado")]
    Completed,
    #[sea_orm(string_value = "error")]
    Failed,
}

/// Run log for one invoice-generation batch: counts of readings created,
/// invoices generated, meters skipped (invoice already existed) and per-meter
/// errors. Partial completion is expected; the batch never aborts on a
/// single meter.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "corridas_generacion")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "periodo_anio")]
    pub period_year: i32,
    #[sea_orm(column_name = "periodo_mes")]
    pub period_month: i32,
    /// True when triggered by the external scheduler rather than an operator.
    #[sea_orm(column_name = "automatica")]
    pub automatic: bool,
    #[sea_orm(column_name = "estado")]
    pub status: RunStatus,
    #[sea_orm(column_name = "lecturas_creadas")]
    pub readings_created: i32,
    #[sea_orm(column_name = "boletas_generadas")]
    pub invoices_created: i32,
    #[sea_orm(column_name = "omitidas")]
    pub skipped: i32,
    #[sea_orm(column_name = "errores")]
    pub errors: i32,
    #[sea_orm(column_name = "mensaje")]
    pub message: Option<String>,
    #[sea_orm(column_name = "iniciada_por")]
    pub started_by: Option<i32>,
    #[sea_orm(column_name = "iniciada_en")]
    pub started_at: DateTimeUtc,
    #[sea_orm(column_name = "duracion_ms")]
    pub duration_ms: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StartedBy",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
