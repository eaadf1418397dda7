use serde::Serialize;

/// Pretty JSON (2-space indent) on stdout.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn print_out<T: Serialize>(
    json: bool,
    data: &[T],
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        print_json(data)?;
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}
