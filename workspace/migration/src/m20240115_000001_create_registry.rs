use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create usuarios table
        manager
            .create_table(
                Table::create()
                    .table(Usuarios::Table)
                    .if_not_exists()
                    .col(pk_auto(Usuarios::Id))
                    .col(string(Usuarios::Username).unique_key())
                    .col(string_null(Usuarios::NombreCompleto))
                    .col(boolean(Usuarios::Activo).default(true))
                    .to_owned(),
            )
            .await?;

        // Create clientes table
        manager
            .create_table(
                Table::create()
                    .table(Clientes::Table)
                    .if_not_exists()
                    .col(pk_auto(Clientes::Id))
                    .col(string(Clientes::Nombre).unique_key())
                    .col(string_null(Clientes::NombreCompleto))
                    .col(string_null(Clientes::Telefono))
                    .col(string_null(Clientes::Email))
                    .col(string_null(Clientes::Direccion))
                    .col(boolean(Clientes::Activo).default(true))
                    .col(timestamp_with_time_zone(Clientes::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create medidores table
        manager
            .create_table(
                Table::create()
                    .table(Medidores::Table)
                    .if_not_exists()
                    .col(pk_auto(Medidores::Id))
                    .col(integer(Medidores::ClienteId))
                    .col(string_null(Medidores::NumeroMedidor))
                    .col(string_null(Medidores::Direccion))
                    .col(boolean(Medidores::Activo).default(true))
                    .col(date_null(Medidores::FechaInstalacion))
                    .col(date_null(Medidores::FechaBaja))
                    .col(string_null(Medidores::MotivoBaja))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_medidor_cliente")
                            .from(Medidores::Table, Medidores::ClienteId)
                            .to(Clientes::Table, Clientes::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create lecturas table
        manager
            .create_table(
                Table::create()
                    .table(Lecturas::Table)
                    .if_not_exists()
                    .col(pk_auto(Lecturas::Id))
                    .col(integer(Lecturas::MedidorId))
                    .col(integer(Lecturas::LecturaM3))
                    .col(date(Lecturas::FechaLectura))
                    .col(string(Lecturas::FotoPath))
                    .col(string_null(Lecturas::FotoNombre))
                    .col(integer(Lecturas::Anio))
                    .col(integer(Lecturas::Mes))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lectura_medidor")
                            .from(Lecturas::Table, Lecturas::MedidorId)
                            .to(Medidores::Table, Medidores::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One reading per meter and period
        manager
            .create_index(
                Index::create()
                    .name("uq_lecturas_medidor_periodo")
                    .table(Lecturas::Table)
                    .col(Lecturas::MedidorId)
                    .col(Lecturas::Anio)
                    .col(Lecturas::Mes)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create tarifas table
        manager
            .create_table(
                Table::create()
                    .table(Tarifas::Table)
                    .if_not_exists()
                    .col(pk_auto(Tarifas::Id))
                    .col(decimal(Tarifas::CargoFijo).decimal_len(12, 2))
                    .col(decimal(Tarifas::PrecioM3).decimal_len(12, 2))
                    .col(boolean(Tarifas::Activo).default(true))
                    .col(timestamp_with_time_zone(Tarifas::CreatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tarifas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lecturas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Medidores::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clientes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Usuarios::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Usuarios {
    Table,
    Id,
    Username,
    NombreCompleto,
    Activo,
}

#[derive(DeriveIden)]
enum Clientes {
    Table,
    Id,
    Nombre,
    NombreCompleto,
    Telefono,
    Email,
    Direccion,
    Activo,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Medidores {
    Table,
    Id,
    ClienteId,
    NumeroMedidor,
    Direccion,
    Activo,
    FechaInstalacion,
    FechaBaja,
    MotivoBaja,
}

#[derive(DeriveIden)]
enum Lecturas {
    Table,
    Id,
    MedidorId,
    LecturaM3,
    FechaLectura,
    FotoPath,
    FotoNombre,
    Anio,
    Mes,
}

#[derive(DeriveIden)]
enum Tarifas {
    Table,
    Id,
    CargoFijo,
    PrecioM3,
    Activo,
    CreatedAt,
}
