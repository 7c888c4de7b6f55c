use plotters::{
    prelude::{BitMapBackend, ChartBuilder, Circle, EmptyElement, IntoDrawingArea},
    series::PointSeries,
    style::{Color, BLUE, WHITE},
};

/// Scatter of the training loss against the iteration it was measured at
pub fn loss_chart(path: &str, losses: &[f32]) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = losses.iter().copied().fold(0f32, f32::max).max(f32::EPSILON);

    let mut chart = ChartBuilder::on(&root)
        .caption("epochs vs cost", ("sans-serif", 20))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..losses.len().max(1) as u32, 0f32..y_max * 1.05)?;

    chart
        .configure_mesh()
        .light_line_style(WHITE)
        .x_desc("epochs")
        .y_desc("cost")
        .draw()?;

    chart.draw_series(PointSeries::of_element(
        losses
            .iter()
            .enumerate()
            .map(|(index, loss)| (index as u32, *loss)),
        3,
        BLUE.filled(),
        &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
    ))?;

    root.present()?;

    Ok(())
}
