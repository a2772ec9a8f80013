use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AppointmentRecord, AppointmentStatus, CustomerRecord, TechnicianRecord, TimeEntryKind,
    TimeEntryRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let customers = vec![
        (
            Uuid::parse_str("8f2b4a61-7c2e-4f29-9d35-64c5a0b1e7a4")?,
            "Rossi Mario",
            "Via Garibaldi 12",
            "Milano",
            "+39 02 1234567",
            "mario.rossi@example.com",
            "caldaia",
        ),
        (
            Uuid::parse_str("1be4e5ac-2a1f-4f8e-b9a7-0d9a2c3f6b11")?,
            "Condominio Aurora",
            "Corso Buenos Aires 45",
            "Milano",
            "+39 02 7654321",
            "amministratore@condominioaurora.it",
            "condizionatore",
        ),
        (
            Uuid::parse_str("c7a9f3d2-5e64-4b18-a2c0-9f8b7e6d5c43")?,
            "Bianchi Lucia",
            "Via Dante 3",
            "Monza",
            "+39 039 998877",
            "lucia.bianchi@example.com",
            "caldaia",
        ),
    ];

    for (id, name, address, city, phone, email, equipment) in customers {
        sqlx::query(
            r#"
            INSERT INTO campo_dispatch.customers
            (id, name, address, city, phone, email, equipment_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, address = EXCLUDED.address, city = EXCLUDED.city
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(address)
        .bind(city)
        .bind(phone)
        .bind(email)
        .bind(equipment)
        .execute(pool)
        .await?;
    }

    let technicians = vec![
        (
            Uuid::parse_str("4d1c9b8a-6f5e-4321-8a7b-2c3d4e5f6a70")?,
            "Marco Bianchi",
            "marco.bianchi@campodispatch.it",
            Some("ExponentPushToken[seed-marco]"),
        ),
        (
            Uuid::parse_str("9e8d7c6b-5a49-4382-b1c0-d9e8f7a6b5c4")?,
            "Laura Conti",
            "laura.conti@campodispatch.it",
            None,
        ),
    ];

    for (id, full_name, email, push_token) in technicians {
        sqlx::query(
            r#"
            INSERT INTO campo_dispatch.technicians (id, full_name, email, push_token)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, push_token = EXCLUDED.push_token
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(push_token)
        .execute(pool)
        .await?;
    }

    let appointments = vec![
        (
            "mario.rossi@example.com",
            "marco.bianchi@campodispatch.it",
            Utc.with_ymd_and_hms(2026, 3, 9, 8, 30, 0)
                .single()
                .context("invalid date")?,
            60,
            "completed",
        ),
        (
            "amministratore@condominioaurora.it",
            "marco.bianchi@campodispatch.it",
            Utc.with_ymd_and_hms(2026, 3, 9, 11, 0, 0)
                .single()
                .context("invalid date")?,
            90,
            "scheduled",
        ),
        (
            "lucia.bianchi@example.com",
            "laura.conti@campodispatch.it",
            Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0)
                .single()
                .context("invalid date")?,
            45,
            "cancelled",
        ),
    ];

    for (customer_email, technician_email, scheduled_at, duration, status) in appointments {
        sqlx::query(
            r#"
            INSERT INTO campo_dispatch.appointments
            (id, customer_id, technician_id, scheduled_at, duration_minutes, status)
            SELECT $1, c.id, t.id, $2, $3, $4
            FROM campo_dispatch.customers c, campo_dispatch.technicians t
            WHERE c.email = $5 AND t.email = $6
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(scheduled_at)
        .bind(duration)
        .bind(status)
        .bind(customer_email)
        .bind(technician_email)
        .execute(pool)
        .await?;
    }

    let day = NaiveDate::from_ymd_opt(2026, 3, 9).context("invalid date")?;
    let entries = vec![
        ("start_day", (8, 0)),
        ("start_break", (12, 0)),
        ("end_break", (12, 30)),
        ("end_day", (17, 0)),
    ];

    for (entry_type, (hour, minute)) in entries {
        let recorded_at = Utc
            .with_ymd_and_hms(2026, 3, 9, hour, minute, 0)
            .single()
            .context("invalid date")?;
        sqlx::query(
            r#"
            INSERT INTO campo_dispatch.time_entries
            (id, technician_id, entry_date, entry_type, recorded_at)
            SELECT $1, t.id, $2, $3, $4
            FROM campo_dispatch.technicians t
            WHERE t.email = 'marco.bianchi@campodispatch.it'
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(day)
        .bind(entry_type)
        .bind(recorded_at)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn appointment_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<AppointmentRecord> {
    let status: String = row.get("status");
    Ok(AppointmentRecord {
        id: row.get("id"),
        scheduled_at: row.get("scheduled_at"),
        duration_minutes: row.get("duration_minutes"),
        status: AppointmentStatus::parse(&status)
            .with_context(|| format!("unknown appointment status {status}"))?,
        customer_id: row.get("customer_id"),
        customer_name: row.get("customer_name"),
        customer_address: row.get("customer_address"),
        customer_city: row.get("customer_city"),
        technician_id: row.get("technician_id"),
        technician_name: row.get("technician_name"),
        signature: row.get("signature"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
    })
}

/// Appointments in [start, end), joined with their customer and
/// technician, optionally restricted to one technician.
pub async fn fetch_appointments(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    technician_email: Option<&str>,
) -> anyhow::Result<Vec<AppointmentRecord>> {
    let mut query = String::from(
        "SELECT a.id, a.scheduled_at, a.duration_minutes, a.status, a.signature, \
         a.latitude, a.longitude, \
         c.id AS customer_id, c.name AS customer_name, \
         c.address AS customer_address, c.city AS customer_city, \
         t.id AS technician_id, t.full_name AS technician_name \
         FROM campo_dispatch.appointments a \
         JOIN campo_dispatch.customers c ON c.id = a.customer_id \
         JOIN campo_dispatch.technicians t ON t.id = a.technician_id \
         WHERE a.scheduled_at >= $1 AND a.scheduled_at < $2",
    );

    if technician_email.is_some() {
        query.push_str(" AND t.email = $3");
    }
    query.push_str(" ORDER BY a.scheduled_at, a.id");

    let mut rows = sqlx::query(&query).bind(start).bind(end);
    if let Some(email) = technician_email {
        rows = rows.bind(email);
    }

    let records = rows.fetch_all(pool).await?;
    let mut appointments = Vec::new();
    for row in records {
        appointments.push(appointment_from_row(&row)?);
    }
    Ok(appointments)
}

pub async fn fetch_appointment(pool: &PgPool, id: Uuid) -> anyhow::Result<AppointmentRecord> {
    let row = sqlx::query(
        "SELECT a.id, a.scheduled_at, a.duration_minutes, a.status, a.signature, \
         a.latitude, a.longitude, \
         c.id AS customer_id, c.name AS customer_name, \
         c.address AS customer_address, c.city AS customer_city, \
         t.id AS technician_id, t.full_name AS technician_name \
         FROM campo_dispatch.appointments a \
         JOIN campo_dispatch.customers c ON c.id = a.customer_id \
         JOIN campo_dispatch.technicians t ON t.id = a.technician_id \
         WHERE a.id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("appointment {id} not found"))?;

    appointment_from_row(&row)
}

pub async fn fetch_technician_by_email(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<TechnicianRecord> {
    let row = sqlx::query(
        "SELECT id, full_name, email, push_token \
         FROM campo_dispatch.technicians WHERE email = $1",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .with_context(|| format!("technician {email} not found"))?;

    Ok(TechnicianRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        push_token: row.get("push_token"),
    })
}

pub async fn fetch_technician(pool: &PgPool, id: Uuid) -> anyhow::Result<TechnicianRecord> {
    let row = sqlx::query(
        "SELECT id, full_name, email, push_token \
         FROM campo_dispatch.technicians WHERE id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("technician {id} not found"))?;

    Ok(TechnicianRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        push_token: row.get("push_token"),
    })
}

/// One technician-day of attendance entries, in clock order.
pub async fn fetch_time_entries(
    pool: &PgPool,
    technician_id: Uuid,
    date: NaiveDate,
) -> anyhow::Result<Vec<TimeEntryRecord>> {
    let rows = sqlx::query(
        "SELECT id, technician_id, entry_date, entry_type, recorded_at, \
         latitude, longitude, is_remote, remote_reason \
         FROM campo_dispatch.time_entries \
         WHERE technician_id = $1 AND entry_date = $2 \
         ORDER BY recorded_at",
    )
    .bind(technician_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        let entry_type: String = row.get("entry_type");
        entries.push(TimeEntryRecord {
            id: row.get("id"),
            technician_id: row.get("technician_id"),
            entry_date: row.get("entry_date"),
            kind: TimeEntryKind::parse(&entry_type),
            recorded_at: row.get("recorded_at"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            is_remote: row.get("is_remote"),
            remote_reason: row.get("remote_reason"),
        });
    }
    Ok(entries)
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CustomerCsvRow {
    id: Option<Uuid>,
    name: String,
    address: String,
    city: String,
    phone: String,
    email: String,
    equipment_type: Option<String>,
    last_service_date: Option<NaiveDate>,
}

/// Upserts customers from the fixed-column CSV contract, keyed on email.
pub async fn import_customers_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CustomerCsvRow>() {
        let row = result?;
        sqlx::query(
            r#"
            INSERT INTO campo_dispatch.customers
            (id, name, address, city, phone, email, equipment_type, last_service_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                address = EXCLUDED.address,
                city = EXCLUDED.city,
                phone = EXCLUDED.phone,
                equipment_type = EXCLUDED.equipment_type,
                last_service_date = EXCLUDED.last_service_date
            "#,
        )
        .bind(row.id.unwrap_or_else(Uuid::new_v4))
        .bind(&row.name)
        .bind(&row.address)
        .bind(&row.city)
        .bind(&row.phone)
        .bind(&row.email)
        .bind(&row.equipment_type)
        .bind(row.last_service_date)
        .execute(pool)
        .await?;

        imported += 1;
    }

    Ok(imported)
}

pub async fn export_customers_csv(
    pool: &PgPool,
    out_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let customers = fetch_customers(pool).await?;
    let mut writer = csv::Writer::from_path(out_path)?;

    for customer in &customers {
        writer.serialize(CustomerCsvRow {
            id: Some(customer.id),
            name: customer.name.clone(),
            address: customer.address.clone(),
            city: customer.city.clone(),
            phone: customer.phone.clone(),
            email: customer.email.clone(),
            equipment_type: customer.equipment_type.clone(),
            last_service_date: customer.last_service_date,
        })?;
    }
    writer.flush()?;

    Ok(customers.len())
}

pub async fn fetch_customers(pool: &PgPool) -> anyhow::Result<Vec<CustomerRecord>> {
    let rows = sqlx::query(
        "SELECT id, name, address, city, phone, email, equipment_type, last_service_date \
         FROM campo_dispatch.customers ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut customers = Vec::new();
    for row in rows {
        customers.push(CustomerRecord {
            id: row.get("id"),
            name: row.get("name"),
            address: row.get("address"),
            city: row.get("city"),
            phone: row.get("phone"),
            email: row.get("email"),
            equipment_type: row.get("equipment_type"),
            last_service_date: row.get("last_service_date"),
        });
    }
    Ok(customers)
}
