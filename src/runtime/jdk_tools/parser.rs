use std::collections::HashMap;
use std::time::Duration;

const KIB: f64 = 1024.0;

/// One row of `jstat -gc -t` output. Sizes are in KiB as jstat prints them.
#[derive(Debug, Clone, PartialEq)]
pub struct JstatGc {
    pub uptime: Duration,
    pub survivor_capacity_kb: f64,
    pub survivor_used_kb: f64,
    pub eden_capacity_kb: f64,
    pub eden_used_kb: f64,
    pub old_capacity_kb: f64,
    pub old_used_kb: f64,
    pub young_gc_count: u64,
    pub full_gc_count: u64,
    pub concurrent_gc_count: u64,
    pub total_gc_time: Duration,
}

impl JstatGc {
    pub fn cycles(&self) -> u64 {
        self.young_gc_count + self.full_gc_count + self.concurrent_gc_count
    }

    pub fn heap_used_bytes(&self) -> u64 {
        to_bytes(self.survivor_used_kb + self.eden_used_kb + self.old_used_kb)
    }

    pub fn heap_capacity_bytes(&self) -> u64 {
        to_bytes(self.survivor_capacity_kb + self.eden_capacity_kb + self.old_capacity_kb)
    }

    pub fn eden_used_bytes(&self) -> u64 {
        to_bytes(self.eden_used_kb)
    }

    pub fn eden_capacity_bytes(&self) -> u64 {
        to_bytes(self.eden_capacity_kb)
    }
}

fn to_bytes(kb: f64) -> u64 {
    (kb.max(0.0) * KIB) as u64
}

pub fn parse_gc(output: &str) -> Result<JstatGc, String> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or("Invalid jstat output format")?;
    let data = lines.next().ok_or("jstat output has no data row")?;

    let columns: Vec<&str> = header.split_whitespace().collect();
    let values: Vec<&str> = data.split_whitespace().collect();
    if columns.len() != values.len() {
        return Err(format!(
            "Expected {} values, got {}",
            columns.len(),
            values.len()
        ));
    }

    let row: HashMap<&str, &str> = columns.into_iter().zip(values).collect();

    let float = |name: &str| -> Result<f64, String> {
        row.get(name)
            .ok_or_else(|| format!("Missing column {}", name))?
            .parse::<f64>()
            .map_err(|e| format!("Failed to parse {}: {}", name, e))
    };
    let count = |name: &str| -> Result<u64, String> {
        row.get(name)
            .ok_or_else(|| format!("Missing column {}", name))?
            .parse::<u64>()
            .map_err(|e| format!("Failed to parse {}: {}", name, e))
    };
    let seconds = |name: &str| -> Result<Duration, String> {
        Duration::try_from_secs_f64(float(name)?).map_err(|e| format!("Invalid {}: {}", name, e))
    };

    // CGC only exists on collectors with concurrent cycles (JDK 9+).
    let concurrent_gc_count = if row.contains_key("CGC") && row["CGC"] != "-" {
        count("CGC")?
    } else {
        0
    };

    Ok(JstatGc {
        uptime: seconds("Timestamp")?,
        survivor_capacity_kb: float("S0C")? + float("S1C")?,
        survivor_used_kb: float("S0U")? + float("S1U")?,
        eden_capacity_kb: float("EC")?,
        eden_used_kb: float("EU")?,
        old_capacity_kb: float("OC")?,
        old_used_kb: float("OU")?,
        young_gc_count: count("YGC")?,
        full_gc_count: count("FGC")?,
        concurrent_gc_count,
        total_gc_time: seconds("GCT")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gc_with_concurrent_columns() {
        let output = include_str!("../../../assets/sample_outputs/jstat_gc.txt");
        let gc = parse_gc(output).unwrap();

        assert_eq!(gc.young_gc_count, 12);
        assert_eq!(gc.full_gc_count, 0);
        assert_eq!(gc.concurrent_gc_count, 4);
        assert_eq!(gc.cycles(), 16);
        assert!((gc.total_gc_time.as_secs_f64() - 0.061).abs() < 1e-9);
        assert_eq!(gc.uptime, Duration::from_millis(1_234_500));
        assert_eq!(gc.heap_used_bytes(), 14_336 * 1024);
        assert_eq!(gc.heap_capacity_bytes(), 262_144 * 1024);
    }

    #[test]
    fn test_parse_gc_without_concurrent_columns() {
        let output = include_str!("../../../assets/sample_outputs/jstat_gc_jdk8.txt");
        let gc = parse_gc(output).unwrap();

        assert_eq!(gc.cycles(), 4);
        assert_eq!(gc.concurrent_gc_count, 0);
        assert_eq!(gc.eden_used_bytes(), 32_768 * 1024);
        assert_eq!(gc.heap_used_bytes(), 38_912 * 1024);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(parse_gc("invalid output").is_err());
        assert!(parse_gc("").is_err());
        assert!(parse_gc("S0C S1C\n1.0").is_err());
    }
}
