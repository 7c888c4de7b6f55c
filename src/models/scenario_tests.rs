#[cfg(test)]
mod tests {
    use crate::models::{attention::rank, price::PriceModel, TrainingConfig};
    use crate::types::SymbolWindow;

    fn batch() -> Vec<SymbolWindow> {
        vec![
            SymbolWindow::new("UP", "ascending", (1..=251).map(|v| v as f32).collect()),
            SymbolWindow::new("DOWN", "descending", (1..=251).rev().map(|v| v as f32).collect()),
            SymbolWindow::new("FLAT", "constant", vec![100.0; 251]),
        ]
    }

    #[test]
    fn test_constant_window_converges() {
        let window = vec![5.0f32; 8];
        let mut model = PriceModel::new(&[window.as_slice()], 1).unwrap();

        let report = model.train(&TrainingConfig::default()).unwrap();

        assert!(report.converged);
        assert!(report.losses.len() <= 100);
        assert!(*report.losses.last().unwrap() < 0.001);
    }

    #[test]
    fn test_ranking_of_ramps_and_constant() {
        let ranked = rank(&batch()).unwrap();
        let symbols = ranked.iter().map(|s| s.symbol.as_str()).collect::<Vec<_>>();

        assert_eq!(ranked.len(), 3);
        // The two ramps sum to a constant, so the constant's mix collapses onto the DC bin.
        assert_eq!(symbols[2], "FLAT");
        assert!(ranked[2].entropy < 1e-6);
        assert!(symbols[..2].contains(&"UP") && symbols[..2].contains(&"DOWN"));

        assert!((ranked[0].entropy - ranked[1].entropy).abs() < 1e-9);
        assert!((ranked[0].entropy - 0.04319).abs() < 1e-4);
        assert!(ranked[0].phase.abs() > 3.14);

        let again = rank(&batch()).unwrap();
        for (a, b) in ranked.iter().zip(again.iter()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.entropy.to_bits(), b.entropy.to_bits());
            assert_eq!(a.phase.to_bits(), b.phase.to_bits());
        }
    }

    #[test]
    fn test_constant_close_is_reconstructed() {
        let windows = batch();
        let mut model = PriceModel::from_windows(&windows, 1).unwrap();

        let report = model.train(&TrainingConfig::default()).unwrap();
        let predictions = model.predictions(&windows);

        assert!(report.losses.last().unwrap() < &report.losses[0]);
        let flat = predictions.iter().find(|p| p.symbol == "FLAT").unwrap();
        assert_eq!(flat.original, 100.0);
        assert!((flat.refined - 100.0).abs() < 1.0);

        let up = predictions.iter().find(|p| p.symbol == "UP").unwrap();
        assert_eq!(up.original, 251.0);
    }
}
