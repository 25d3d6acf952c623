use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create pagos table
        manager
            .create_table(
                Table::create()
                    .table(Pagos::Table)
                    .if_not_exists()
                    .col(pk_auto(Pagos::Id))
                    .col(string(Pagos::NumeroPago).unique_key())
                    .col(integer(Pagos::ClienteId))
                    .col(decimal(Pagos::MontoTotal).decimal_len(12, 2))
                    .col(decimal(Pagos::MontoAplicado).decimal_len(12, 2).default(0))
                    .col(decimal(Pagos::MontoAFavor).decimal_len(12, 2).default(0))
                    .col(string(Pagos::Estado))
                    .col(string_null(Pagos::MetodoPago))
                    .col(string_null(Pagos::ComprobantePath))
                    .col(string_null(Pagos::Notas))
                    .col(date_null(Pagos::FechaPago))
                    .col(date(Pagos::FechaEnvio))
                    .col(date_null(Pagos::FechaProcesamiento))
                    .col(integer_null(Pagos::ProcesadoPor))
                    .col(string_null(Pagos::MotivoRechazo))
                    .col(timestamp_with_time_zone(Pagos::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pago_cliente")
                            .from(Pagos::Table, Pagos::ClienteId)
                            .to(Clientes::Table, Clientes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pago_usuario")
                            .from(Pagos::Table, Pagos::ProcesadoPor)
                            .to(Usuarios::Table, Usuarios::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create pago_boletas join table
        manager
            .create_table(
                Table::create()
                    .table(PagoBoletas::Table)
                    .if_not_exists()
                    .col(pk_auto(PagoBoletas::Id))
                    .col(integer(PagoBoletas::PagoId))
                    .col(integer(PagoBoletas::BoletaId))
                    .col(decimal(PagoBoletas::MontoAplicado).decimal_len(12, 2))
                    .col(boolean(PagoBoletas::EsPagoCompleto).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pago_boletas_pago")
                            .from(PagoBoletas::Table, PagoBoletas::PagoId)
                            .to(Pagos::Table, Pagos::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pago_boletas_boleta")
                            .from(PagoBoletas::Table, PagoBoletas::BoletaId)
                            .to(Boletas::Table, Boletas::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One application row per (payment, invoice)
        manager
            .create_index(
                Index::create()
                    .name("uq_pago_boletas_pago_boleta")
                    .table(PagoBoletas::Table)
                    .col(PagoBoletas::PagoId)
                    .col(PagoBoletas::BoletaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create saldos_cliente table
        manager
            .create_table(
                Table::create()
                    .table(SaldosCliente::Table)
                    .if_not_exists()
                    .col(pk_auto(SaldosCliente::Id))
                    .col(integer(SaldosCliente::ClienteId).unique_key())
                    .col(
                        decimal(SaldosCliente::SaldoDisponible)
                            .decimal_len(12, 2)
                            .default(0),
                    )
                    .col(timestamp_with_time_zone(SaldosCliente::UltimaActualizacion))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saldo_cliente")
                            .from(SaldosCliente::Table, SaldosCliente::ClienteId)
                            .to(Clientes::Table, Clientes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create movimientos_saldo table (append-only audit trail)
        manager
            .create_table(
                Table::create()
                    .table(MovimientosSaldo::Table)
                    .if_not_exists()
                    .col(pk_auto(MovimientosSaldo::Id))
                    .col(integer(MovimientosSaldo::ClienteId))
                    .col(string(MovimientosSaldo::Tipo))
                    .col(string(MovimientosSaldo::Origen))
                    .col(decimal(MovimientosSaldo::Monto).decimal_len(12, 2))
                    .col(decimal(MovimientosSaldo::SaldoAnterior).decimal_len(12, 2))
                    .col(decimal(MovimientosSaldo::SaldoNuevo).decimal_len(12, 2))
                    .col(integer_null(MovimientosSaldo::PagoId))
                    .col(integer_null(MovimientosSaldo::BoletaId))
                    .col(integer_null(MovimientosSaldo::UsuarioId))
                    .col(string_null(MovimientosSaldo::Descripcion))
                    .col(timestamp_with_time_zone(MovimientosSaldo::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movimiento_cliente")
                            .from(MovimientosSaldo::Table, MovimientosSaldo::ClienteId)
                            .to(Clientes::Table, Clientes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movimiento_pago")
                            .from(MovimientosSaldo::Table, MovimientosSaldo::PagoId)
                            .to(Pagos::Table, Pagos::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movimiento_boleta")
                            .from(MovimientosSaldo::Table, MovimientosSaldo::BoletaId)
                            .to(Boletas::Table, Boletas::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movimiento_usuario")
                            .from(MovimientosSaldo::Table, MovimientosSaldo::UsuarioId)
                            .to(Usuarios::Table, Usuarios::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MovimientosSaldo::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaldosCliente::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PagoBoletas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pagos::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Pagos {
    Table,
    Id,
    NumeroPago,
    ClienteId,
    MontoTotal,
    MontoAplicado,
    MontoAFavor,
    Estado,
    MetodoPago,
    ComprobantePath,
    Notas,
    FechaPago,
    FechaEnvio,
    FechaProcesamiento,
    ProcesadoPor,
    MotivoRechazo,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PagoBoletas {
    Table,
    Id,
    PagoId,
    BoletaId,
    MontoAplicado,
    EsPagoCompleto,
}

#[derive(DeriveIden)]
enum SaldosCliente {
    Table,
    Id,
    ClienteId,
    SaldoDisponible,
    UltimaActualizacion,
}

#[derive(DeriveIden)]
enum MovimientosSaldo {
    Table,
    Id,
    ClienteId,
    Tipo,
    Origen,
    Monto,
    SaldoAnterior,
    SaldoNuevo,
    PagoId,
    BoletaId,
    UsuarioId,
    Descripcion,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Clientes {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Usuarios {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Boletas {
    Table,
    Id,
}
