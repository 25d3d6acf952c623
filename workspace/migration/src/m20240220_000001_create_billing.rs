use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create boletas table
        manager
            .create_table(
                Table::create()
                    .table(Boletas::Table)
                    .if_not_exists()
                    .col(pk_auto(Boletas::Id))
                    .col(string(Boletas::NumeroBoleta).unique_key())
                    .col(integer(Boletas::LecturaId).unique_key())
                    .col(integer(Boletas::MedidorId))
                    .col(integer(Boletas::PeriodoAnio))
                    .col(integer(Boletas::PeriodoMes))
                    .col(integer(Boletas::LecturaAnterior))
                    .col(integer(Boletas::LecturaActual))
                    .col(integer(Boletas::ConsumoM3))
                    .col(decimal(Boletas::CargoFijo).decimal_len(12, 2))
                    .col(decimal(Boletas::PrecioM3).decimal_len(12, 2))
                    .col(decimal(Boletas::SubtotalConsumo).decimal_len(12, 2))
                    .col(decimal(Boletas::Total).decimal_len(12, 2))
                    .col(decimal(Boletas::SaldoPendiente).decimal_len(12, 2))
                    .col(decimal(Boletas::MontoPagado).decimal_len(12, 2).default(0))
                    .col(date(Boletas::FechaEmision))
                    .col(date_null(Boletas::FechaPago))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boleta_lectura")
                            .from(Boletas::Table, Boletas::LecturaId)
                            .to(Lecturas::Table, Lecturas::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boleta_medidor")
                            .from(Boletas::Table, Boletas::MedidorId)
                            .to(Medidores::Table, Medidores::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One invoice per meter and period
        manager
            .create_index(
                Index::create()
                    .name("uq_boletas_medidor_periodo")
                    .table(Boletas::Table)
                    .col(Boletas::MedidorId)
                    .col(Boletas::PeriodoAnio)
                    .col(Boletas::PeriodoMes)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create corridas_generacion table (batch run log)
        manager
            .create_table(
                Table::create()
                    .table(CorridasGeneracion::Table)
                    .if_not_exists()
                    .col(pk_auto(CorridasGeneracion::Id))
                    .col(integer(CorridasGeneracion::PeriodoAnio))
                    .col(integer(CorridasGeneracion::PeriodoMes))
                    .col(boolean(CorridasGeneracion::Automatica).default(false))
                    .col(string(CorridasGeneracion::Estado))
                    .col(integer(CorridasGeneracion::LecturasCreadas).default(0))
                    .col(integer(CorridasGeneracion::BoletasGeneradas).default(0))
                    .col(integer(CorridasGeneracion::Omitidas).default(0))
                    .col(integer(CorridasGeneracion::Errores).default(0))
                    .col(string_null(CorridasGeneracion::Mensaje))
                    .col(integer_null(CorridasGeneracion::IniciadaPor))
                    .col(timestamp_with_time_zone(CorridasGeneracion::IniciadaEn))
                    .col(big_integer(CorridasGeneracion::DuracionMs).default(0))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CorridasGeneracion::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boletas::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Boletas {
    Table,
    Id,
    NumeroBoleta,
    LecturaId,
    MedidorId,
    PeriodoAnio,
    PeriodoMes,
    LecturaAnterior,
    LecturaActual,
    ConsumoM3,
    CargoFijo,
    PrecioM3,
    SubtotalConsumo,
    Total,
    SaldoPendiente,
    MontoPagado,
    FechaEmision,
    FechaPago,
}

#[derive(DeriveIden)]
enum CorridasGeneracion {
    Table,
    Id,
    PeriodoAnio,
    PeriodoMes,
    Automatica,
    Estado,
    LecturasCreadas,
    BoletasGeneradas,
    Omitidas,
    Errores,
    Mensaje,
    IniciadaPor,
    IniciadaEn,
    DuracionMs,
}

#[derive(DeriveIden)]
enum Lecturas {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Medidores {
    Table,
    Id,
}
