use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

const WEEKDAYS: [&str; 7] = [
    "Понедельник", "Вторник", "Среда", "Четверг", "Пятница", "Суббота", "Воскресенье",
];

/// Zone name and the centre its delivery points scatter around.
const ZONES: [(&str, f64, f64); 4] = [
    ("Центр", 55.751, 37.618),
    ("Север", 56.010, 37.480),
    ("Юг", 55.420, 37.760),
    ("Запад", 55.700, 36.850),
];

const COUNTERPARTIES: [&str; 6] = [
    "ООО Ромашка", "АО Север-Трейд", "ИП Иванов", "ООО Вектор", "ГК Магистраль", "ООО Лента",
];

const GROUPS: [&str; 3] = ["Розница", "Опт", "HoReCa"];

/// Free-text weights the way they are typed into the sheet.
fn weight_text(rng: &mut SimpleRng) -> Option<String> {
    let kg = 5.0 + rng.next_f64() * 2500.0;
    match rng.below(6) {
        0 => None,
        1 => Some("н/д".to_string()),
        2 => Some(format!("{:.1} кг", kg).replace('.', ",")),
        // Thousands separated by a non-breaking space.
        3 if kg >= 1000.0 => {
            let whole = kg as u64;
            Some(format!("{}\u{a0}{:03}", whole / 1000, whole % 1000))
        }
        _ => Some(format!("{kg:.2}")),
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // A fixed pool of delivery points so some coordinates repeat.
    let points: Vec<(&str, f64, f64, &str)> = (0..60)
        .map(|_| {
            let (zone, lat, lon) = *rng.pick(&ZONES);
            let lat = ((lat + (rng.next_f64() - 0.5) * 0.4) * 1e6).round() / 1e6;
            let lon = ((lon + (rng.next_f64() - 0.5) * 0.6) * 1e6).round() / 1e6;
            (zone, lat, lon, *rng.pick(&COUNTERPARTIES))
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("start date")?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;

    let mut documents = Vec::new();
    let mut dates = Vec::new();
    let mut weekdays = Vec::new();
    let mut zones = Vec::new();
    let mut counterparties = Vec::new();
    let mut groups = Vec::new();
    let mut amounts = Vec::new();
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    let mut weights = Vec::new();

    for n in 0..400 {
        let (zone, lat, lon, counterparty) = *rng.pick(&points);
        let date = start + chrono::Days::new(rng.below(270) as u64);

        documents.push(format!("РН-{:06}", 1000 + n));
        dates.push((date - epoch).num_days() as i32);
        weekdays.push(WEEKDAYS[date.weekday().num_days_from_monday() as usize]);
        zones.push(zone);
        counterparties.push(counterparty);
        groups.push(*rng.pick(&GROUPS));
        amounts.push(((500.0 + rng.next_f64() * 250_000.0) * 100.0).round() / 100.0);
        lats.push(lat);
        lons.push(lon);
        weights.push(weight_text(&mut rng));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("Номер документа", DataType::Utf8, false),
        Field::new("Дата документа", DataType::Date32, false),
        Field::new("День недели", DataType::Utf8, false),
        Field::new("Зона", DataType::Utf8, false),
        Field::new("Холдинг, контрагент", DataType::Utf8, false),
        Field::new("группа", DataType::Utf8, false),
        Field::new("Сумма с НДС", DataType::Float64, false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
        Field::new("Вес", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(documents)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(StringArray::from(weekdays)),
            Arc::new(StringArray::from(zones)),
            Arc::new(StringArray::from(counterparties)),
            Arc::new(StringArray::from(groups)),
            Arc::new(Float64Array::from(amounts)),
            Arc::new(Float64Array::from(lats)),
            Arc::new(Float64Array::from(lons)),
            Arc::new(StringArray::from(weights)),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let output_path = "sample_visits.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!(
        "Wrote {} visits at {} delivery points to {output_path}",
        batch.num_rows(),
        points.len()
    );
    Ok(())
}
